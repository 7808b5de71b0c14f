//! Payload normalization.
//!
//! Accepted top-level shapes:
//! - a JSON object mapping resource key -> record object, or
//! - a JSON array of record objects, each carrying a `"#machine_name"`
//!   string attribute that supplies the resource key.
//!
//! Within a record, marker-prefixed keys become attributes and all
//! other keys must hold nested record objects.

use std::collections::BTreeMap;
use std::fmt;

use crate::record::{NormalizedRecord, ScalarValue, ATTRIBUTE_MARKER};

/// Attribute that names a record's resource key in array payloads.
pub const KEY_ATTRIBUTE: &str = "#machine_name";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while normalizing one site's payload.
///
/// `Parse` means the payload is not valid JSON at all; the `Shape*`
/// variants mean valid JSON in an unusable layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// Payload is not valid JSON (or not UTF-8).
    Parse(String),
    /// Top level is neither an object of records nor an array of records.
    ShapeTopLevel(String),
    /// An array entry lacks a usable `"#machine_name"` attribute.
    ShapeMissingKey { index: usize },
    /// A record slot holds something other than a JSON object.
    ShapeRecordNotObject { key: String },
    /// A non-marker key inside a record holds a non-object value.
    ShapeChildNotObject { path: String, key: String },
}

impl SnapshotError {
    /// True for the shape family (valid JSON, wrong layout).
    pub fn is_shape(&self) -> bool {
        !matches!(self, SnapshotError::Parse(_))
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Parse(msg) => write!(f, "invalid JSON payload: {msg}"),
            SnapshotError::ShapeTopLevel(got) => write!(
                f,
                "top level must be an object or array of records, got {got}"
            ),
            SnapshotError::ShapeMissingKey { index } => write!(
                f,
                "array record at index {index} has no '{KEY_ATTRIBUTE}' string attribute"
            ),
            SnapshotError::ShapeRecordNotObject { key } => {
                write!(f, "record '{key}' is not a JSON object")
            }
            SnapshotError::ShapeChildNotObject { path, key } => write!(
                f,
                "child '{key}' under '{path}' is not a JSON object \
                 (non-attribute keys must hold nested records)"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one site's raw payload into keyed record trees.
pub fn normalize_payload(
    payload: &[u8],
) -> Result<BTreeMap<String, NormalizedRecord>, SnapshotError> {
    let text =
        std::str::from_utf8(payload).map_err(|e| SnapshotError::Parse(format!("not UTF-8: {e}")))?;
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| SnapshotError::Parse(e.to_string()))?;

    let mut out: BTreeMap<String, NormalizedRecord> = BTreeMap::new();

    match value {
        serde_json::Value::Object(map) => {
            for (key, entry) in map {
                let obj = entry
                    .as_object()
                    .ok_or_else(|| SnapshotError::ShapeRecordNotObject { key: key.clone() })?;
                let record = record_from_object(&key, obj, &key)?;
                out.insert(key, record);
            }
        }
        serde_json::Value::Array(entries) => {
            for (index, entry) in entries.iter().enumerate() {
                let obj = entry
                    .as_object()
                    .ok_or(SnapshotError::ShapeMissingKey { index })?;
                let key = match obj.get(KEY_ATTRIBUTE) {
                    Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
                    _ => return Err(SnapshotError::ShapeMissingKey { index }),
                };
                let record = record_from_object(&key, obj, &key)?;
                out.insert(key, record);
            }
        }
        other => {
            return Err(SnapshotError::ShapeTopLevel(json_type_name(&other).to_string()));
        }
    }

    Ok(out)
}

fn record_from_object(
    key: &str,
    obj: &serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Result<NormalizedRecord, SnapshotError> {
    let mut record = NormalizedRecord::new(key);

    for (field, value) in obj {
        if field.starts_with(ATTRIBUTE_MARKER) {
            record
                .attributes
                .insert(field.clone(), ScalarValue::from_json(value));
        } else {
            let child_obj =
                value
                    .as_object()
                    .ok_or_else(|| SnapshotError::ShapeChildNotObject {
                        path: path.to_string(),
                        key: field.clone(),
                    })?;
            let child_path = format!("{path}/{field}");
            let child = record_from_object(field, child_obj, &child_path)?;
            record.children.insert(field.clone(), child);
        }
    }

    Ok(record)
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
