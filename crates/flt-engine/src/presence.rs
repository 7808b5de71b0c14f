//! Presence reduction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use flt_registry::short_label;

/// Which sites have a resource enabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "sites", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceStatus {
    /// Enabled on every known site.
    All,
    /// Enabled nowhere (or seen nowhere).
    None,
    /// Enabled on some sites; carries their short labels.
    Partial(Vec<String>),
}

/// Reduce a per-site indicator table to a presence status.
///
/// `indicators` holds `(site_id, enabled)` rows in insertion order;
/// sites absent from the table count as disabled, exactly like an
/// explicit `false`. `all_sites` is the full denominator, including
/// sites whose queries failed this run — a failed site can therefore
/// never be mistaken for "present everywhere".
///
/// Partial labels preserve the table's insertion order rather than
/// sorting. Legacy behavior, kept intentionally: downstream documents
/// have been reviewed against it.
///
/// Pure function; an empty table is not an error.
pub fn reduce_presence(
    indicators: &[(String, bool)],
    all_sites: &BTreeSet<String>,
) -> PresenceStatus {
    let enabled: Vec<&String> = indicators
        .iter()
        .filter(|(_, on)| *on)
        .map(|(site, _)| site)
        .collect();

    if enabled.is_empty() {
        return PresenceStatus::None;
    }

    let enabled_set: BTreeSet<&str> = enabled.iter().map(|s| s.as_str()).collect();
    let all: BTreeSet<&str> = all_sites.iter().map(|s| s.as_str()).collect();
    if enabled_set == all {
        return PresenceStatus::All;
    }

    PresenceStatus::Partial(enabled.iter().map(|site| short_label(site)).collect())
}
