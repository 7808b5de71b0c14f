//! flt-config
//!
//! Layered YAML operator configuration: later documents override
//! earlier ones, the merged result is canonicalized to compact JSON
//! and hashed so an audit report can state exactly which configuration
//! produced it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

use flt_registry::Site;

/// Known secret-like prefixes. A leaf string value starting with one of
/// these aborts loading: credentials belong in the environment, never
/// in audit configuration that gets hashed into reports.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
];

/// Top-level keys this tool reads. Anything else in the merged config
/// is reported so typos (`hideEmtpy`) cannot silently change a run.
const RECOGNIZED_KEYS: &[&str] = &[
    "sites",
    "priorityGroups",
    "hideEmpty",
    "siteTimeoutMs",
    "includeLocalSite",
    "localSiteId",
    "localRoot",
    "maxConcurrency",
];

// ---------------------------------------------------------------------------
// Loaded config
// ---------------------------------------------------------------------------

/// Result of merging one or more YAML documents.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Merge in order: earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // Compact serialization; key order is deterministic because the
    // merge rebuilds maps from deterministically-ordered YAML input.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(val) = v.pointer(&ptr) {
            if let Some(s) = val.as_str() {
                if looks_like_secret(s) {
                    bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
                }
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Typed options
// ---------------------------------------------------------------------------

/// Recognized audit options, with defaults applied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditOptions {
    /// Target instances, in declaration order.
    pub sites: Vec<Site>,
    /// Grouping precedence for display ordering.
    pub priority_groups: Vec<String>,
    /// Omit resources absent from every site.
    pub hide_empty: bool,
    /// Per-site query deadline.
    pub site_timeout_ms: u64,
    /// Include the invoking instance as one of the sites.
    pub include_local_site: bool,
    /// Site id the local entity source answers for.
    pub local_site_id: String,
    /// Directory holding the local instance's `{kind}.json` listings.
    pub local_root: String,
    /// Upper bound on concurrent site queries.
    pub max_concurrency: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            priority_groups: Vec::new(),
            hide_empty: false,
            site_timeout_ms: 30_000,
            include_local_site: false,
            local_site_id: "@local".to_string(),
            local_root: ".".to_string(),
            max_concurrency: 8,
        }
    }
}

impl AuditOptions {
    /// Parse options out of a merged config value.
    pub fn from_value(config_json: &Value) -> Result<AuditOptions> {
        serde_json::from_value(config_json.clone()).context("invalid audit options")
    }
}

/// Top-level keys present in the merged config that this tool does not
/// read, sorted. Empty means clean.
pub fn unknown_keys(config_json: &Value) -> Vec<String> {
    let recognized: BTreeSet<&str> = RECOGNIZED_KEYS.iter().copied().collect();
    match config_json.as_object() {
        Some(map) => {
            let mut out: Vec<String> = map
                .keys()
                .filter(|k| !recognized.contains(k.as_str()))
                .cloned()
                .collect();
            out.sort();
            out
        }
        None => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_documents_override_earlier_ones() {
        let base = "siteTimeoutMs: 30000\nhideEmpty: false\n";
        let env = "hideEmpty: true\n";
        let cfg = load_layered_yaml_from_strings(&[base, env]).unwrap();
        let opts = AuditOptions::from_value(&cfg.config_json).unwrap();
        assert!(opts.hide_empty);
        assert_eq!(opts.site_timeout_ms, 30_000);
    }

    #[test]
    fn hash_is_stable_for_identical_input() {
        let doc = "sites:\n  - id: \"@a\"\n    endpoint: https://a.example\n";
        let one = load_layered_yaml_from_strings(&[doc]).unwrap();
        let two = load_layered_yaml_from_strings(&[doc]).unwrap();
        assert_eq!(one.config_hash, two.config_hash);
        assert_eq!(one.canonical_json, two.canonical_json);
    }

    #[test]
    fn hash_changes_when_config_changes() {
        let one = load_layered_yaml_from_strings(&["hideEmpty: false"]).unwrap();
        let two = load_layered_yaml_from_strings(&["hideEmpty: true"]).unwrap();
        assert_ne!(one.config_hash, two.config_hash);
    }

    #[test]
    fn deep_merge_preserves_sibling_keys() {
        let base = "sites:\n  - id: \"@a\"\n    endpoint: https://a.example\nhideEmpty: true\n";
        let overlay = "siteTimeoutMs: 1000\n";
        let cfg = load_layered_yaml_from_strings(&[base, overlay]).unwrap();
        let opts = AuditOptions::from_value(&cfg.config_json).unwrap();
        assert_eq!(opts.sites.len(), 1);
        assert!(opts.hide_empty);
        assert_eq!(opts.site_timeout_ms, 1000);
    }

    #[test]
    fn secret_literal_aborts_loading() {
        let doc = "sites:\n  - id: \"@a\"\n    endpoint: sk_live_abcdef123456\n";
        let err = load_layered_yaml_from_strings(&[doc]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
    }

    #[test]
    fn defaults_apply_for_missing_keys() {
        let cfg = load_layered_yaml_from_strings(&["{}"]).unwrap();
        let opts = AuditOptions::from_value(&cfg.config_json).unwrap();
        assert_eq!(opts.site_timeout_ms, 30_000);
        assert_eq!(opts.max_concurrency, 8);
        assert!(!opts.include_local_site);
        assert!(opts.sites.is_empty());
    }

    #[test]
    fn unknown_keys_are_reported_sorted() {
        let cfg =
            load_layered_yaml_from_strings(&["zz: 1\nhideEmpty: true\naa: 2\n"]).unwrap();
        assert_eq!(unknown_keys(&cfg.config_json), vec!["aa", "zz"]);
    }

    #[test]
    fn recognized_keys_are_not_reported() {
        let cfg = load_layered_yaml_from_strings(&[
            "priorityGroups: [Core]\nhideEmpty: true\nmaxConcurrency: 4\n",
        ])
        .unwrap();
        assert!(unknown_keys(&cfg.config_json).is_empty());
    }
}
