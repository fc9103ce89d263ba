//! Log record model and batches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes describing the entity emitting the logs (e.g. `instance`)
pub type ResourceAttributes = BTreeMap<String, String>;

/// One structured log entry. Immutable once constructed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    timestamp: DateTime<Utc>,
    body: String,
    attributes: BTreeMap<String, String>,
}

impl LogRecord {
    /// Create a record stamped with the current wall-clock time
    pub fn new(body: impl Into<String>) -> Self {
        Self::with_timestamp(current_timestamp(), body)
    }

    pub fn with_timestamp(timestamp: DateTime<Utc>, body: impl Into<String>) -> Self {
        Self {
            timestamp,
            body: body.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Records submitted together in one push, sharing one set of resource attributes
#[derive(Clone, Debug, Default)]
pub struct Batch {
    resource: ResourceAttributes,
    records: Vec<LogRecord>,
}

impl Batch {
    pub fn new(resource: ResourceAttributes) -> Self {
        Self {
            resource,
            records: Vec::new(),
        }
    }

    /// Append a record; push order follows append order
    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn with_record(mut self, record: LogRecord) -> Self {
        self.push(record);
        self
    }

    pub fn resource(&self) -> &ResourceAttributes {
        &self.resource
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Current wall-clock time with nanosecond precision
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}
