//! Pushes a single traceable log record to a Loki endpoint

use loki_push_exporter::{ExporterConfig, LokiExporter, build_demo_batch, run_lifecycle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    initialize_tracing();

    info!("Starting Loki push exporter v{}", env!("CARGO_PKG_VERSION"));

    let config = ExporterConfig::from_env();
    let instance = std::env::var("SERVICE_INSTANCE").unwrap_or_else(|_| "my-service".to_string());

    info!(
        "Exporter configuration - Endpoint: {}, Labels: {:?}, Instance: {}",
        config.endpoint,
        config.resource_attribute_to_label.keys().collect::<Vec<_>>(),
        instance
    );

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight push");
            signal_token.cancel();
        }
    });

    let mut exporter = LokiExporter::new(config);
    let batch = build_demo_batch(&instance);

    if run_lifecycle(&mut exporter, batch, &token).await.is_err() {
        std::process::exit(1);
    }

    info!("everything seems to have worked just fine");
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
