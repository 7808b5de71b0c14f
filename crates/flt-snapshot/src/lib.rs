//! flt-snapshot
//!
//! Canonical normalization of raw per-site payloads.
//!
//! This crate converts raw JSON listings into [`NormalizedRecord`]
//! trees with an explicit attribute/child split, validated shape, and
//! deterministic ordering (BTree maps throughout).
//!
//! It does **not**:
//! - fetch data (no transports)
//! - merge trees across sites (that is `flt-merge`)
//! - reduce presence (that is `flt-engine`)

mod normalizer;
mod record;

pub use normalizer::{normalize_payload, SnapshotError, KEY_ATTRIBUTE};
pub use record::{enabled_indicator, NormalizedRecord, ScalarValue, ATTRIBUTE_MARKER};
