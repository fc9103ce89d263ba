//! Start -> consume -> shutdown sequencing for a single batch

use crate::errors::Result;
use crate::exporter::LogsExporter;
use crate::telemetry::{Batch, LogRecord, ResourceAttributes};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Build a one-record batch whose body carries a fresh id, so the entry can
/// be found again in the remote store.
pub fn build_demo_batch(instance: &str) -> Batch {
    let resource = ResourceAttributes::from([("instance".to_string(), instance.to_string())]);
    let body = format!(
        "Adding a test log entry from a local binary: {}",
        Uuid::new_v4()
    );

    Batch::new(resource).with_record(LogRecord::new(body))
}

/// Drive one batch through an exporter.
///
/// Stops at the first failure. A failed start is returned as is; once start
/// succeeds, shutdown runs on every path and a push error takes precedence
/// over a shutdown error.
pub async fn run_lifecycle<E>(exporter: &mut E, batch: Batch, token: &CancellationToken) -> Result<()>
where
    E: LogsExporter + ?Sized,
{
    if let Err(e) = exporter.start(token).await {
        error!("Failed to start the exporter: {}", e);
        return Err(e);
    }

    let pushed = exporter.consume_logs(token, batch).await;
    if let Err(e) = &pushed {
        error!("Failed to send data to the log store: {}", e);
    }

    let shut_down = exporter.shutdown(token).await;
    if let Err(e) = &shut_down {
        error!("Failed to shut down the exporter: {}", e);
    }

    pushed?;
    shut_down?;

    info!("Batch pushed and exporter shut down");
    Ok(())
}
