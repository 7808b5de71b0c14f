//! HTTP transport for site snapshots.
//!
//! Each audited instance exposes its introspection listing at
//! `GET {endpoint}/fleet-audit/{kind}` as raw JSON. The transport does
//! not validate payload contents; the normalizer owns that.

use std::time::Duration;

use flt_registry::{ResourceKind, Site};

use crate::query::{QueryError, SiteQuery};

/// [`SiteQuery`] over plain HTTP(S).
#[derive(Clone)]
pub struct HttpSiteQuery {
    client: reqwest::Client,
}

impl HttpSiteQuery {
    /// Build a transport with a per-request deadline.
    ///
    /// The engine additionally applies its own per-site timeout; the
    /// client-level deadline is a backstop so a stalled TCP connection
    /// cannot pin a worker past the run.
    pub fn new(request_timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| QueryError::Unreachable(format!("client build failed: {e}")))?;
        Ok(Self { client })
    }

    fn url_for(site: &Site, kind: ResourceKind) -> String {
        format!(
            "{}/fleet-audit/{}",
            site.endpoint.trim_end_matches('/'),
            kind.as_str()
        )
    }
}

#[async_trait::async_trait]
impl SiteQuery for HttpSiteQuery {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn query(&self, site: &Site, kind: ResourceKind) -> Result<Vec<u8>, QueryError> {
        let url = Self::url_for(site, kind);
        tracing::debug!(site = %site.id, %kind, %url, "querying site");
        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                QueryError::Timeout { elapsed_ms: 0 }
            } else {
                QueryError::Unreachable(format!("GET {url}: {e}"))
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(QueryError::NotSupported(kind));
        }
        if !status.is_success() {
            return Err(QueryError::MalformedOutput(format!(
                "GET {url} returned status {status}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| QueryError::MalformedOutput(format!("body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}
