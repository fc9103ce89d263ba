//! Loki Push Exporter Library
//!
//! A minimal client that encodes structured log records and pushes them to a
//! Loki-compatible log store over its HTTP push API.

pub mod config;
pub mod driver;
pub mod encoder;
pub mod errors;
pub mod exporter;
pub mod labels;
pub mod telemetry;
pub mod transport;

pub use config::ExporterConfig;
pub use driver::{build_demo_batch, run_lifecycle};
pub use encoder::{LineFormat, PayloadEncoder, decode};
pub use errors::{ExporterError, Result};
pub use exporter::{ExporterState, LogsExporter, LokiExporter};
pub use labels::{LabelSet, build_labels};
pub use telemetry::{Batch, LogRecord, ResourceAttributes};
pub use transport::{Connector, HttpConnector, HttpTransport, PushRequest, PushResponse, Transport};
