//! Run output types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flt_merge::DivergenceEntry;
use flt_registry::ResourceKind;
use flt_snapshot::NormalizedRecord;

use crate::presence::PresenceStatus;

/// One per-site failure observed during a run.
///
/// Non-fatal by design: the failing site contributes nothing further
/// for this resource kind and the run completes with the rest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailure {
    pub site_id: String,
    pub error: String,
}

/// The reconciled view handed to the (out-of-scope) reporting layer.
///
/// Pure data, deterministically ordered: running the engine twice over
/// identical inputs yields byte-identical serializations. Anything
/// per-run (id, wall clock) lives in [`RunInfo`] instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedDataset {
    pub resource_kind: ResourceKind,
    /// Canonical merged record per resource key.
    pub per_key: BTreeMap<String, NormalizedRecord>,
    /// Presence status per resource key.
    pub presence: BTreeMap<String, PresenceStatus>,
    /// Resource keys in display order (priority grouping applied).
    pub display_order: Vec<String>,
    /// Cross-site attribute disagreements, in fold order.
    pub divergences: Vec<DivergenceEntry>,
    /// Per-site query/normalization failures, in sorted site order.
    pub failures: Vec<SiteFailure>,
}

/// Per-run envelope: identifies one invocation without perturbing the
/// deterministic dataset body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub resource_kind: ResourceKind,
    pub config_hash: Option<String>,
}

impl RunInfo {
    pub fn new(resource_kind: ResourceKind, config_hash: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            resource_kind,
            config_hash,
        }
    }
}
