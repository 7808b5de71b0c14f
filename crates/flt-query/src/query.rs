//! Query contract shared by every transport.

use std::fmt;

use flt_registry::{ResourceKind, Site};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`SiteQuery`] implementation may return.
///
/// All variants are per-site and non-fatal to a run: the engine logs
/// them into the failure list and keeps going with the other sites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// The site could not be contacted at all.
    Unreachable(String),
    /// The query did not complete within its deadline.
    Timeout { elapsed_ms: u64 },
    /// The site answered with something that is not a usable payload.
    MalformedOutput(String),
    /// The site does not expose the requested resource kind.
    NotSupported(ResourceKind),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Unreachable(msg) => write!(f, "site unreachable: {msg}"),
            QueryError::Timeout { elapsed_ms } => {
                write!(f, "query timed out after {elapsed_ms}ms")
            }
            QueryError::MalformedOutput(msg) => write!(f, "malformed output: {msg}"),
            QueryError::NotSupported(kind) => {
                write!(f, "resource kind '{kind}' not supported by site")
            }
        }
    }
}

impl std::error::Error for QueryError {}

// ---------------------------------------------------------------------------
// Raw snapshot
// ---------------------------------------------------------------------------

/// One query attempt against one site, successful or not.
///
/// Ephemeral: produced during the collect phase of a run and consumed
/// by the fold. The payload is raw JSON bytes exactly as the site
/// returned them; normalization happens downstream.
#[derive(Clone, Debug)]
pub struct RawSnapshot {
    pub site: Site,
    pub resource_kind: ResourceKind,
    pub outcome: Result<Vec<u8>, QueryError>,
}

// ---------------------------------------------------------------------------
// Query trait
// ---------------------------------------------------------------------------

/// Per-site snapshot transport.
///
/// Implementations must be object-safe (`Arc<dyn SiteQuery>`) and
/// `Send + Sync` so queries can be issued from concurrent tasks.
/// A query must be independent of every other query: no shared mutable
/// state, no ordering assumptions.
#[async_trait::async_trait]
pub trait SiteQuery: Send + Sync {
    /// Human-readable transport name (e.g. `"http"`).
    fn name(&self) -> &'static str;

    /// Fetch the raw JSON listing for one resource kind from one site.
    async fn query(&self, site: &Site, kind: ResourceKind) -> Result<Vec<u8>, QueryError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct CannedQuery {
        payload: Vec<u8>,
    }

    #[async_trait::async_trait]
    impl SiteQuery for CannedQuery {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn query(&self, _site: &Site, _kind: ResourceKind) -> Result<Vec<u8>, QueryError> {
            Ok(self.payload.clone())
        }
    }

    #[tokio::test]
    async fn canned_query_returns_fixture_bytes() {
        let q: Arc<dyn SiteQuery> = Arc::new(CannedQuery {
            payload: b"{}".to_vec(),
        });
        let site = Site::new("@a", "https://a.example");
        let got = q.query(&site, ResourceKind::Extensions).await.unwrap();
        assert_eq!(got, b"{}".to_vec());
    }

    #[test]
    fn query_error_display_unreachable() {
        let err = QueryError::Unreachable("connection refused".to_string());
        assert_eq!(err.to_string(), "site unreachable: connection refused");
    }

    #[test]
    fn query_error_display_timeout() {
        let err = QueryError::Timeout { elapsed_ms: 2500 };
        assert_eq!(err.to_string(), "query timed out after 2500ms");
    }

    #[test]
    fn query_error_display_not_supported() {
        let err = QueryError::NotSupported(ResourceKind::FormElements);
        assert_eq!(
            err.to_string(),
            "resource kind 'form-elements' not supported by site"
        );
    }
}
