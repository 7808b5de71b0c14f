use flt_snapshot::ScalarValue;
use serde::{Deserialize, Serialize};

/// Evidence of one cross-site disagreement on one attribute.
///
/// Informational only, never an error: the merged record keeps the
/// existing (first-seen) value and the run continues. Entries are
/// append-only within a run.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DivergenceEntry {
    /// Slash-joined path from the resource key down to the record
    /// whose attribute diverged (e.g. `"registration/name_block"`).
    pub path: String,
    /// The attribute key that disagreed (e.g. `"#required"`).
    pub attribute: String,
    /// Value already in the accumulator (kept).
    pub existing: ScalarValue,
    /// Value from the later site (discarded after logging).
    pub incoming: ScalarValue,
}
