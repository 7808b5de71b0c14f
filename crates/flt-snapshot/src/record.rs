//! Normalized tree records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Record keys beginning with this marker are attributes (leaf
/// metadata); all other keys are nested child records.
pub const ATTRIBUTE_MARKER: char = '#';

// ---------------------------------------------------------------------------
// Scalar values
// ---------------------------------------------------------------------------

/// Leaf attribute value.
///
/// Non-scalar attribute payloads (arrays, objects, non-integer
/// numbers) are canonicalized into their compact JSON rendering so
/// equality checks and divergence logs are byte-wise deterministic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    /// Canonical compact JSON of a composite or non-integer value.
    Composite(String),
}

impl ScalarValue {
    /// Convert a JSON value into its canonical scalar form.
    pub fn from_json(v: &serde_json::Value) -> ScalarValue {
        match v {
            serde_json::Value::Null => ScalarValue::Null,
            serde_json::Value::Bool(b) => ScalarValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ScalarValue::Int(i),
                None => ScalarValue::Composite(n.to_string()),
            },
            serde_json::Value::String(s) => ScalarValue::Text(s.clone()),
            other => ScalarValue::Composite(other.to_string()),
        }
    }

    /// Render for divergence logs and reports.
    pub fn display(&self) -> String {
        match self {
            ScalarValue::Null => "null".to_string(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Text(s) => s.clone(),
            ScalarValue::Composite(json) => json.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized record
// ---------------------------------------------------------------------------

/// One logical resource as seen by a single site, or the accumulated
/// cross-site merge of it (the merged form has the same shape and is
/// built by `flt-merge`).
///
/// Invariant: the source is always a tree; no cycles are possible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Stable cross-site identifier for this resource.
    pub key: String,
    /// Leaf metadata, keyed by marker-prefixed attribute name.
    pub attributes: BTreeMap<String, ScalarValue>,
    /// Nested structural sub-records, keyed by child name.
    pub children: BTreeMap<String, NormalizedRecord>,
}

impl NormalizedRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// True when `key` names a descendant child anywhere in the tree.
    pub fn has_descendant(&self, key: &str) -> bool {
        self.children
            .iter()
            .any(|(k, child)| k == key || child.has_descendant(key))
    }
}

// ---------------------------------------------------------------------------
// Enabled indicator
// ---------------------------------------------------------------------------

/// Extract the per-site boolean "enabled" indicator from a record.
///
/// Missing indicator means present-implies-true. Integer status counts
/// as enabled when nonzero; string status recognizes the legacy
/// `"open"` / `"true"` / `"1"` spellings. Anything else is disabled.
pub fn enabled_indicator(record: &NormalizedRecord) -> bool {
    match record.attributes.get("#enabled") {
        None => true,
        Some(ScalarValue::Bool(b)) => *b,
        Some(ScalarValue::Int(i)) => *i != 0,
        Some(ScalarValue::Text(s)) => matches!(s.as_str(), "open" | "true" | "1"),
        Some(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_from_json_primitives() {
        assert_eq!(ScalarValue::from_json(&json!(null)), ScalarValue::Null);
        assert_eq!(ScalarValue::from_json(&json!(true)), ScalarValue::Bool(true));
        assert_eq!(ScalarValue::from_json(&json!(42)), ScalarValue::Int(42));
        assert_eq!(
            ScalarValue::from_json(&json!("hello")),
            ScalarValue::Text("hello".to_string())
        );
    }

    #[test]
    fn scalar_from_json_composites_canonicalized() {
        assert_eq!(
            ScalarValue::from_json(&json!(["a", "b"])),
            ScalarValue::Composite(r#"["a","b"]"#.to_string())
        );
        assert_eq!(
            ScalarValue::from_json(&json!(1.5)),
            ScalarValue::Composite("1.5".to_string())
        );
    }

    #[test]
    fn enabled_defaults_to_true_when_absent() {
        let rec = NormalizedRecord::new("views");
        assert!(enabled_indicator(&rec));
    }

    #[test]
    fn enabled_bool_and_int_forms() {
        let mut rec = NormalizedRecord::new("views");
        rec.attributes
            .insert("#enabled".to_string(), ScalarValue::Bool(false));
        assert!(!enabled_indicator(&rec));

        rec.attributes
            .insert("#enabled".to_string(), ScalarValue::Int(1));
        assert!(enabled_indicator(&rec));

        rec.attributes
            .insert("#enabled".to_string(), ScalarValue::Int(0));
        assert!(!enabled_indicator(&rec));
    }

    #[test]
    fn enabled_legacy_string_forms() {
        let mut rec = NormalizedRecord::new("contact");
        rec.attributes
            .insert("#enabled".to_string(), ScalarValue::Text("open".to_string()));
        assert!(enabled_indicator(&rec));

        rec.attributes.insert(
            "#enabled".to_string(),
            ScalarValue::Text("closed".to_string()),
        );
        assert!(!enabled_indicator(&rec));
    }

    #[test]
    fn enabled_composite_is_disabled() {
        let mut rec = NormalizedRecord::new("x");
        rec.attributes.insert(
            "#enabled".to_string(),
            ScalarValue::Composite("[1]".to_string()),
        );
        assert!(!enabled_indicator(&rec));
    }

    #[test]
    fn has_descendant_walks_nested_children() {
        let mut leaf = NormalizedRecord::new("email");
        leaf.attributes
            .insert("#title".to_string(), ScalarValue::Text("Email".to_string()));

        let mut group = NormalizedRecord::new("contact_block");
        group.children.insert("email".to_string(), leaf);

        let mut root = NormalizedRecord::new("form");
        root.children.insert("contact_block".to_string(), group);

        assert!(root.has_descendant("contact_block"));
        assert!(root.has_descendant("email"));
        assert!(!root.has_descendant("phone"));
    }
}
