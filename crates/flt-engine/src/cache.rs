//! Explicit label translation cache.
//!
//! The reporting layer used to append missing translations to its
//! lookup table as a side effect of formatting cells. That is now an
//! explicit object injected at the report boundary: `lookup` never
//! mutates, `record_miss` is an explicit call, and the collected
//! misses can be flushed wherever the caller keeps its table.

use std::collections::{BTreeMap, BTreeSet};

/// Lookup table for display labels with explicit miss tracking.
#[derive(Clone, Debug, Default)]
pub struct LabelCache {
    entries: BTreeMap<String, String>,
    misses: BTreeSet<String>,
}

impl LabelCache {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries,
            misses: BTreeSet::new(),
        }
    }

    /// Translate a key, if known. Never mutates.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    /// Record a key that had no translation.
    pub fn record_miss(&mut self, key: &str) {
        if !self.entries.contains_key(key) {
            self.misses.insert(key.to_string());
        }
    }

    /// Keys recorded as missing, sorted.
    pub fn misses(&self) -> impl Iterator<Item = &str> {
        self.misses.iter().map(|s| s.as_str())
    }
}
