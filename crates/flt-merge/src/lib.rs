//! flt-merge
//!
//! Recursive cross-site tree merge.
//!
//! Behavioral contract:
//! - Attributes are first-write-wins; a conflicting later value is
//!   discarded after logging a divergence entry.
//! - Children are a monotone union; shared children merge recursively.
//! - Fold order is the caller's responsibility (sorted site ids) so
//!   repeated runs over identical inputs produce byte-identical
//!   divergence logs and merged values.
//!
//! Deterministic, pure logic. No IO. No transports.

mod engine;
mod types;

pub use engine::merge_into;
pub use types::DivergenceEntry;
