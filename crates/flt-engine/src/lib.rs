//! flt-engine
//!
//! Orchestrates one reconciliation run: collect raw snapshots from
//! every site (bounded parallel IO), normalize, fold into per-key
//! merged records in sorted site-id order (single writer, no locks),
//! reduce per-key presence, and order the result for display.
//!
//! Architectural decisions:
//! - Collect first, fold second: the merge phase never shares mutable
//!   state with in-flight queries.
//! - A failed site is logged and counts as absent for every key; it is
//!   never removed from the presence denominator, so an outage cannot
//!   masquerade as "present everywhere".
//! - Attribute conflicts are first-write-wins with a logged divergence.

mod cache;
mod dataset;
mod engine;
mod ordering;
mod presence;

pub use cache::LabelCache;
pub use dataset::{MergedDataset, RunInfo, SiteFailure};
pub use engine::{run, EngineConfig, EngineError};
pub use ordering::priority_grouping_sort;
pub use presence::{reduce_presence, PresenceStatus};
