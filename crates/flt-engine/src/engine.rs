//! The reconciliation run itself.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use flt_merge::{merge_into, DivergenceEntry};
use flt_query::{QueryError, RawSnapshot, SiteQuery};
use flt_registry::{ResourceKind, SiteRegistry};
use flt_snapshot::{enabled_indicator, normalize_payload, NormalizedRecord};

use crate::dataset::{MergedDataset, SiteFailure};
use crate::ordering::priority_grouping_sort;
use crate::presence::reduce_presence;

/// Attribute that supplies a record's display group label.
const GROUP_ATTRIBUTE: &str = "#category";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Per-run engine options.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Grouping precedence for display ordering.
    pub priority_groups: Vec<String>,
    /// Omit keys absent from every site.
    pub hide_empty: bool,
    /// Independent deadline for each site query.
    pub site_timeout_ms: u64,
    /// Upper bound on concurrent site queries; the effective pool size
    /// is `min(site_count, max_concurrency)`.
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            priority_groups: Vec::new(),
            hide_empty: false,
            site_timeout_ms: 30_000,
            max_concurrency: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Pre-flight errors. Raised before any site is queried; per-site
/// failures during the run are data (`MergedDataset::failures`), not
/// errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    EmptySiteList,
    InvalidConfig(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::EmptySiteList => write!(f, "site list is empty"),
            EngineError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Execute one reconciliation run for one resource kind.
///
/// Phase 1 queries every site concurrently (bounded pool, independent
/// per-site timeouts). Phase 2 folds the successful snapshots into the
/// accumulator sequentially, in ascending site-id order, so the output
/// is byte-identical across runs over identical inputs regardless of
/// query completion order.
pub async fn run(
    registry: &SiteRegistry,
    kind: ResourceKind,
    config: &EngineConfig,
    query: Arc<dyn SiteQuery>,
) -> Result<MergedDataset, EngineError> {
    preflight(registry, config)?;

    let sites = registry.sorted_sites();
    info!(site_count = sites.len(), %kind, "starting reconciliation run");

    let snapshots = collect_snapshots(&sites, kind, config, query).await;

    // Fold phase: single writer, sorted site order, no locks.
    let mut per_key: BTreeMap<String, NormalizedRecord> = BTreeMap::new();
    let mut indicator_rows: BTreeMap<String, Vec<(String, bool)>> = BTreeMap::new();
    let mut divergences: Vec<DivergenceEntry> = Vec::new();
    let mut failures: Vec<SiteFailure> = Vec::new();

    for site in &sites {
        let Some(snapshot) = snapshots.get(&site.id) else {
            // Worker vanished without an outcome (task panic). Treated
            // like any other per-site failure.
            warn!(site = %site.id, "no snapshot outcome for site");
            failures.push(SiteFailure {
                site_id: site.id.clone(),
                error: "query task aborted".to_string(),
            });
            continue;
        };

        let payload = match &snapshot.outcome {
            Ok(payload) => payload,
            Err(err) => {
                warn!(site = %site.id, %err, "site query failed");
                failures.push(SiteFailure {
                    site_id: site.id.clone(),
                    error: err.to_string(),
                });
                continue;
            }
        };

        let records = match normalize_payload(payload) {
            Ok(records) => records,
            Err(err) => {
                warn!(site = %site.id, %err, "snapshot normalization failed");
                failures.push(SiteFailure {
                    site_id: site.id.clone(),
                    error: err.to_string(),
                });
                continue;
            }
        };

        for (key, record) in records {
            indicator_rows
                .entry(key.clone())
                .or_default()
                .push((site.id.clone(), enabled_indicator(&record)));

            match per_key.get_mut(&key) {
                None => {
                    per_key.insert(key, record);
                }
                Some(accumulator) => {
                    merge_into(accumulator, &record, &key, &mut divergences);
                }
            }
        }
    }

    // Presence phase. Failed sites stay in the denominator.
    let all_sites: BTreeSet<String> = registry.site_ids().into_iter().collect();
    let empty_rows: Vec<(String, bool)> = Vec::new();
    let mut presence: BTreeMap<String, crate::presence::PresenceStatus> = BTreeMap::new();
    for key in per_key.keys() {
        let rows = indicator_rows.get(key).unwrap_or(&empty_rows);
        presence.insert(key.clone(), reduce_presence(rows, &all_sites));
    }

    if config.hide_empty {
        let hidden: Vec<String> = presence
            .iter()
            .filter(|(_, status)| **status == crate::presence::PresenceStatus::None)
            .map(|(k, _)| k.clone())
            .collect();
        for key in hidden {
            presence.remove(&key);
            per_key.remove(&key);
        }
    }

    let display_order = display_order(&per_key, &config.priority_groups);

    info!(
        keys = per_key.len(),
        divergences = divergences.len(),
        failures = failures.len(),
        "reconciliation run complete"
    );

    Ok(MergedDataset {
        resource_kind: kind,
        per_key,
        presence,
        display_order,
        divergences,
        failures,
    })
}

fn preflight(registry: &SiteRegistry, config: &EngineConfig) -> Result<(), EngineError> {
    if registry.is_empty() {
        return Err(EngineError::EmptySiteList);
    }
    if config.site_timeout_ms == 0 {
        return Err(EngineError::InvalidConfig(
            "siteTimeoutMs must be greater than zero".to_string(),
        ));
    }
    if config.max_concurrency == 0 {
        return Err(EngineError::InvalidConfig(
            "maxConcurrency must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Collect phase: parallel IO, no shared mutable state. Outcomes are
/// keyed by site id; completion order is irrelevant.
async fn collect_snapshots(
    sites: &[flt_registry::Site],
    kind: ResourceKind,
    config: &EngineConfig,
    query: Arc<dyn SiteQuery>,
) -> BTreeMap<String, RawSnapshot> {
    let pool_size = sites.len().min(config.max_concurrency);
    let semaphore = Arc::new(Semaphore::new(pool_size));
    let timeout = Duration::from_millis(config.site_timeout_ms);

    let mut join_set: JoinSet<RawSnapshot> = JoinSet::new();
    for site in sites.iter().cloned() {
        let query = Arc::clone(&query);
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let permit = semaphore.acquire_owned().await;
            let outcome = match permit {
                Ok(_permit) => {
                    let started = Instant::now();
                    match tokio::time::timeout(timeout, query.query(&site, kind)).await {
                        Ok(result) => result,
                        Err(_elapsed) => Err(QueryError::Timeout {
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        }),
                    }
                }
                Err(_closed) => Err(QueryError::Unreachable("worker pool closed".to_string())),
            };
            RawSnapshot {
                site,
                resource_kind: kind,
                outcome,
            }
        });
    }

    let mut snapshots: BTreeMap<String, RawSnapshot> = BTreeMap::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(snapshot) => {
                snapshots.insert(snapshot.site.id.clone(), snapshot);
            }
            Err(join_err) => {
                // The missing site surfaces as a failure in the fold.
                warn!(%join_err, "snapshot task failed to join");
            }
        }
    }
    snapshots
}

/// Resource keys ordered for display: priority groups first, then the
/// rest, each tier sorted by (group, key).
fn display_order(
    per_key: &BTreeMap<String, NormalizedRecord>,
    priority_groups: &[String],
) -> Vec<String> {
    let items: Vec<(String, String)> = per_key
        .iter()
        .map(|(key, record)| (group_label(record), key.clone()))
        .collect();

    priority_grouping_sort(items, priority_groups, |item| item.clone())
        .into_iter()
        .map(|(_, key)| key)
        .collect()
}

fn group_label(record: &NormalizedRecord) -> String {
    match record.attributes.get(GROUP_ATTRIBUTE) {
        Some(value) => match value {
            flt_snapshot::ScalarValue::Text(s) => s.clone(),
            other => other.display(),
        },
        None => String::new(),
    }
}
