//! flt-registry
//!
//! Fleet membership: which instances exist and what categories of
//! configuration can be introspected from them.
//!
//! Deterministic, pure data. No IO.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// Category of structural configuration collected from each site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Installed extensions/modules and their enabled status.
    Extensions,
    /// Top-level form definitions.
    FormDefinitions,
    /// Nested form element trees.
    FormElements,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Extensions => "extensions",
            ResourceKind::FormDefinitions => "form-definitions",
            ResourceKind::FormElements => "form-elements",
        }
    }

    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Extensions,
        ResourceKind::FormDefinitions,
        ResourceKind::FormElements,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = UnknownResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extensions" => Ok(ResourceKind::Extensions),
            "form-definitions" => Ok(ResourceKind::FormDefinitions),
            "form-elements" => Ok(ResourceKind::FormElements),
            other => Err(UnknownResourceKind(other.to_string())),
        }
    }
}

/// Error for an unrecognized resource-kind string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownResourceKind(pub String);

impl fmt::Display for UnknownResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown resource kind '{}' (expected one of: extensions, \
             form-definitions, form-elements)",
            self.0
        )
    }
}

impl std::error::Error for UnknownResourceKind {}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// One independently deployed instance of the audited platform.
///
/// Identity is by `id`; the endpoint is opaque to everything except the
/// transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Stable identifier, unique within a registry (e.g. `"@alpha.prod"`).
    pub id: String,
    /// Transport endpoint (base URL or alias URI).
    pub endpoint: String,
}

impl Site {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Errors raised while assembling a [`SiteRegistry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Two sites share the same id.
    DuplicateSiteId(String),
    /// A site has an empty id or endpoint.
    EmptyField { site_id: String, field: &'static str },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateSiteId(id) => {
                write!(f, "duplicate site id '{id}' in registry")
            }
            RegistryError::EmptyField { site_id, field } => {
                write!(f, "site '{site_id}' has an empty {field}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Enumerates the target instances of one audit run.
///
/// Iteration via [`SiteRegistry::sorted_sites`] is always in ascending
/// site-id order so downstream folds are independent of declaration
/// order and of query completion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    /// Build a registry, rejecting duplicate ids and empty fields.
    pub fn new(sites: Vec<Site>) -> Result<Self, RegistryError> {
        let mut seen: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
        for site in &sites {
            if site.id.is_empty() {
                return Err(RegistryError::EmptyField {
                    site_id: site.id.clone(),
                    field: "id",
                });
            }
            if site.endpoint.is_empty() {
                return Err(RegistryError::EmptyField {
                    site_id: site.id.clone(),
                    field: "endpoint",
                });
            }
            if !seen.insert(site.id.as_str()) {
                return Err(RegistryError::DuplicateSiteId(site.id.clone()));
            }
        }
        Ok(Self { sites })
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Sites in declaration order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Sites sorted by id. This is the canonical fold order.
    pub fn sorted_sites(&self) -> Vec<Site> {
        let mut out = self.sites.clone();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// All site ids, sorted.
    pub fn site_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sites.iter().map(|s| s.id.clone()).collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sites.iter().any(|s| s.id == id)
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Derive the short display label for a site id.
///
/// Strips the account delimiter (`@`), keeps the first dot-delimited
/// segment, and uppercases it: `"@alpha.prod"` becomes `"ALPHA"`.
pub fn short_label(site_id: &str) -> String {
    let stripped: String = site_id.chars().filter(|c| *c != '@').collect();
    let first = stripped.split('.').next().unwrap_or("");
    first.to_uppercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn resource_kind_round_trips_through_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn resource_kind_rejects_unknown() {
        let err = ResourceKind::from_str("widgets").unwrap_err();
        assert!(err.to_string().contains("widgets"));
    }

    #[test]
    fn registry_rejects_duplicate_ids() {
        let err = SiteRegistry::new(vec![
            Site::new("@a", "https://a.example"),
            Site::new("@a", "https://other.example"),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSiteId("@a".to_string()));
    }

    #[test]
    fn registry_rejects_empty_endpoint() {
        let err = SiteRegistry::new(vec![Site::new("@a", "")]).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyField { field: "endpoint", .. }));
    }

    #[test]
    fn sorted_sites_ignores_declaration_order() {
        let reg = SiteRegistry::new(vec![
            Site::new("@zeta", "https://z.example"),
            Site::new("@alpha", "https://a.example"),
        ])
        .unwrap();
        let sorted = reg.sorted_sites();
        let ids: Vec<&str> = sorted.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["@alpha", "@zeta"]);
    }

    #[test]
    fn short_label_strips_at_and_takes_first_segment() {
        assert_eq!(short_label("@alpha.prod"), "ALPHA");
        assert_eq!(short_label("beta.stage.internal"), "BETA");
        assert_eq!(short_label("@gamma"), "GAMMA");
    }

    #[test]
    fn short_label_empty_input() {
        assert_eq!(short_label(""), "");
    }
}
