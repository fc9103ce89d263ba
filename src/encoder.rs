//! Loki push API payload encoding
//!
//! A batch becomes exactly one stream:
//!
//! ```json
//! {"streams":[{"stream":{"instance":"svc-1"},"values":[["1700000000000000000","hello"]]}]}
//! ```
//!
//! Timestamps are nanoseconds since the Unix epoch, rendered as decimal strings.

use crate::errors::{ExporterError, Result};
use crate::labels::{LabelSet, build_labels, sanitize_label_name};
use crate::telemetry::{Batch, LogRecord, ResourceAttributes};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// How a record is rendered into a log line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    /// The record body, verbatim
    #[default]
    Body,
    /// A JSON object carrying body, record attributes and resource attributes
    Json,
}

impl std::str::FromStr for LineFormat {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "body" => Ok(LineFormat::Body),
            "json" => Ok(LineFormat::Json),
            other => Err(ExporterError::Config(format!("unknown line format: {}", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushPayload {
    pub streams: Vec<Stream>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stream {
    pub stream: LabelSet,
    pub values: Vec<[String; 2]>,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    body: &'a str,
    #[serde(skip_serializing_if = "is_empty_map")]
    attributes: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "is_empty_map")]
    resources: &'a ResourceAttributes,
}

fn is_empty_map(map: &&BTreeMap<String, String>) -> bool {
    map.is_empty()
}

/// Turns batches into push request bodies
#[derive(Debug, Clone)]
pub struct PayloadEncoder {
    label_mapping: BTreeMap<String, String>,
    line_format: LineFormat,
}

impl PayloadEncoder {
    pub fn new(label_mapping: BTreeMap<String, String>, line_format: LineFormat) -> Self {
        Self {
            label_mapping,
            line_format,
        }
    }

    /// Encode a batch without touching it.
    ///
    /// Fails on an empty batch, on an empty label set, and when two labels
    /// sanitize to the same name.
    pub fn encode(&self, batch: &Batch) -> Result<Vec<u8>> {
        if batch.is_empty() {
            return Err(ExporterError::Encoding("batch contains no log records".to_string()));
        }

        let labels = self.stream_labels(batch.resource())?;

        let values = batch
            .records()
            .iter()
            .map(|record| -> Result<[String; 2]> {
                Ok([
                    timestamp_nanos(record)?.to_string(),
                    self.render_line(record, batch.resource())?,
                ])
            })
            .collect::<Result<Vec<_>>>()?;

        let payload = PushPayload {
            streams: vec![Stream {
                stream: labels,
                values,
            }],
        };

        Ok(serde_json::to_vec(&payload)?)
    }

    fn stream_labels(&self, resource: &ResourceAttributes) -> Result<LabelSet> {
        let mut labels = LabelSet::new();

        for (name, value) in build_labels(resource, &self.label_mapping) {
            let sanitized = sanitize_label_name(&name);
            if labels.contains_key(&sanitized) {
                return Err(ExporterError::Encoding(format!(
                    "label {} collides with another label after sanitization",
                    name
                )));
            }
            labels.insert(sanitized, value);
        }

        if labels.is_empty() {
            return Err(ExporterError::Encoding(
                "no labels could be derived from resource attributes".to_string(),
            ));
        }

        Ok(labels)
    }

    fn render_line(&self, record: &LogRecord, resource: &ResourceAttributes) -> Result<String> {
        match self.line_format {
            LineFormat::Body => Ok(record.body().to_string()),
            LineFormat::Json => Ok(serde_json::to_string(&JsonLine {
                body: record.body(),
                attributes: record.attributes(),
                resources: resource,
            })?),
        }
    }
}

fn timestamp_nanos(record: &LogRecord) -> Result<i64> {
    record.timestamp().timestamp_nanos_opt().ok_or_else(|| {
        ExporterError::Encoding(format!(
            "timestamp {} is outside the nanosecond range",
            record.timestamp()
        ))
    })
}

/// One stream read back from a push body
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStream {
    pub labels: LabelSet,
    pub entries: Vec<(DateTime<Utc>, String)>,
}

/// Parse a push body produced by [`PayloadEncoder::encode`]
pub fn decode(bytes: &[u8]) -> Result<Vec<DecodedStream>> {
    let payload: PushPayload = serde_json::from_slice(bytes)?;

    payload
        .streams
        .into_iter()
        .map(|stream| -> Result<DecodedStream> {
            let entries = stream
                .values
                .into_iter()
                .map(|[ts, line]| -> Result<(DateTime<Utc>, String)> {
                    let nanos: i64 = ts.parse().map_err(|_| {
                        ExporterError::Encoding(format!("invalid timestamp: {}", ts))
                    })?;
                    Ok((Utc.timestamp_nanos(nanos), line))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(DecodedStream {
                labels: stream.stream,
                entries,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance_mapping() -> BTreeMap<String, String> {
        BTreeMap::from([("instance".to_string(), String::new())])
    }

    fn resource() -> ResourceAttributes {
        BTreeMap::from([("instance".to_string(), "svc-1".to_string())])
    }

    #[test]
    fn test_encode_decode_preserves_order_and_timestamps() {
        let t1 = Utc.timestamp_opt(1_700_000_000, 1).unwrap();
        let t2 = Utc.timestamp_opt(1_600_000_000, 999_999_999).unwrap();
        let batch = Batch::new(resource())
            .with_record(LogRecord::with_timestamp(t1, "first"))
            .with_record(LogRecord::with_timestamp(t2, "second"));

        let encoder = PayloadEncoder::new(instance_mapping(), LineFormat::Body);
        let bytes = encoder.encode(&batch).unwrap();
        let streams = decode(&bytes).unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].labels.get("instance").map(String::as_str), Some("svc-1"));
        assert_eq!(
            streams[0].entries,
            vec![(t1, "first".to_string()), (t2, "second".to_string())]
        );
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_wire_shape() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let batch = Batch::new(resource()).with_record(LogRecord::with_timestamp(ts, "hello"));

        let encoder = PayloadEncoder::new(instance_mapping(), LineFormat::Body);
        let bytes = encoder.encode(&batch).unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"streams":[{"stream":{"instance":"svc-1"},"values":[["1700000000000000000","hello"]]}]}"#
        );
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let encoder = PayloadEncoder::new(instance_mapping(), LineFormat::Body);
        let result = encoder.encode(&Batch::new(resource()));

        assert!(matches!(result, Err(ExporterError::Encoding(_))));
    }

    #[test]
    fn test_sanitized_label_collision_is_rejected() {
        let resource = BTreeMap::from([
            ("service.name".to_string(), "a".to_string()),
            ("service_name".to_string(), "b".to_string()),
        ]);
        let mapping = BTreeMap::from([
            ("service.name".to_string(), String::new()),
            ("service_name".to_string(), String::new()),
        ]);
        let batch = Batch::new(resource).with_record(LogRecord::new("x"));

        let result = PayloadEncoder::new(mapping, LineFormat::Body).encode(&batch);
        assert!(matches!(result, Err(ExporterError::Encoding(_))));
    }

    #[test]
    fn test_batch_without_labels_is_rejected() {
        let batch = Batch::new(ResourceAttributes::new()).with_record(LogRecord::new("x"));
        let result = PayloadEncoder::new(instance_mapping(), LineFormat::Body).encode(&batch);

        assert!(matches!(result, Err(ExporterError::Encoding(_))));
    }

    #[test]
    fn test_json_line_format() {
        let batch = Batch::new(resource())
            .with_record(LogRecord::new("hello").with_attribute("user_id", "42"));

        let encoder = PayloadEncoder::new(instance_mapping(), LineFormat::Json);
        let streams = decode(&encoder.encode(&batch).unwrap()).unwrap();
        let line: serde_json::Value = serde_json::from_str(&streams[0].entries[0].1).unwrap();

        assert_eq!(line["body"], "hello");
        assert_eq!(line["attributes"]["user_id"], "42");
        assert_eq!(line["resources"]["instance"], "svc-1");
    }

    #[test]
    fn test_line_format_from_str() {
        assert_eq!("body".parse::<LineFormat>().unwrap(), LineFormat::Body);
        assert_eq!("JSON".parse::<LineFormat>().unwrap(), LineFormat::Json);
        assert!("logfmt".parse::<LineFormat>().is_err());
    }
}
