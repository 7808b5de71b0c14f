//! flt-query
//!
//! Transport boundary for per-site configuration snapshots.
//!
//! This crate defines **only** the query contract and its concrete
//! transports. No normalization, no merging, no presence logic belongs
//! here: the reconciliation core consumes [`SiteQuery`] as a trait
//! object so it can be driven by canned JSON fixtures in tests instead
//! of live remote calls.

mod http;
mod local;
mod query;

pub use http::HttpSiteQuery;
pub use local::{DirEntitySource, LocalOverlay};
pub use query::{QueryError, RawSnapshot, SiteQuery};
