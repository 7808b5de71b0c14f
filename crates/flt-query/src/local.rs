//! Local entity source.
//!
//! The invoking instance can contribute its own resource listings
//! without a network round trip. [`DirEntitySource`] reads
//! `{root}/{kind}.json` from disk; [`LocalOverlay`] routes the local
//! site id to it and everything else to the wrapped remote transport,
//! so a locally reachable site is never queried (or counted) twice.

use std::path::PathBuf;

use flt_registry::{ResourceKind, Site};

use crate::query::{QueryError, SiteQuery};

/// Reads the local instance's own resource listings from a directory.
#[derive(Clone, Debug)]
pub struct DirEntitySource {
    root: PathBuf,
}

impl DirEntitySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.as_str()))
    }
}

#[async_trait::async_trait]
impl SiteQuery for DirEntitySource {
    fn name(&self) -> &'static str {
        "local-dir"
    }

    async fn query(&self, _site: &Site, kind: ResourceKind) -> Result<Vec<u8>, QueryError> {
        let path = self.path_for(kind);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(QueryError::NotSupported(kind))
            }
            Err(e) => Err(QueryError::MalformedOutput(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Routes one site id to a local source, the rest to a remote transport.
pub struct LocalOverlay<Q> {
    remote: Q,
    local_site_id: String,
    local: DirEntitySource,
}

impl<Q: SiteQuery> LocalOverlay<Q> {
    pub fn new(remote: Q, local_site_id: impl Into<String>, local: DirEntitySource) -> Self {
        Self {
            remote,
            local_site_id: local_site_id.into(),
            local,
        }
    }
}

#[async_trait::async_trait]
impl<Q: SiteQuery> SiteQuery for LocalOverlay<Q> {
    fn name(&self) -> &'static str {
        "local-overlay"
    }

    async fn query(&self, site: &Site, kind: ResourceKind) -> Result<Vec<u8>, QueryError> {
        if site.id == self.local_site_id {
            self.local.query(site, kind).await
        } else {
            self.remote.query(site, kind).await
        }
    }
}
