//! Derivation of stream labels from resource attributes

use crate::telemetry::ResourceAttributes;
use std::collections::BTreeMap;

/// Labels attached to one pushed stream, keyed by label name
pub type LabelSet = BTreeMap<String, String>;

/// Build the label set for a batch.
///
/// For every `(attribute, override)` in `mapping`, a non-empty override is
/// used verbatim; otherwise the attribute's value in `resource` is used.
/// Attributes with neither are skipped.
pub fn build_labels(
    resource: &ResourceAttributes,
    mapping: &BTreeMap<String, String>,
) -> LabelSet {
    mapping
        .iter()
        .filter_map(|(attribute, override_value)| {
            if !override_value.is_empty() {
                return Some((attribute.clone(), override_value.clone()));
            }
            resource
                .get(attribute)
                .map(|value| (attribute.clone(), value.clone()))
        })
        .collect()
}

/// Map an attribute name onto the label grammar `[a-zA-Z_][a-zA-Z0-9_]*`.
///
/// Invalid characters become `_`; a leading digit is prefixed with `_`.
pub fn sanitize_label_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if sanitized.is_empty() || sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }

    sanitized
}
