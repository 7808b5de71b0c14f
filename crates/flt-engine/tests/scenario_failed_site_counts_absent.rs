//! Per-site failures are data, not run errors: the failing site is
//! logged, contributes nothing, and stays in the presence denominator.

use std::collections::BTreeMap;
use std::sync::Arc;

use flt_engine::{run, EngineConfig, PresenceStatus};
use flt_query::{QueryError, SiteQuery};
use flt_registry::{ResourceKind, Site, SiteRegistry};
use flt_snapshot::ScalarValue;

struct ScriptedQuery {
    payloads: BTreeMap<String, Result<Vec<u8>, QueryError>>,
}

impl ScriptedQuery {
    fn new(entries: &[(&str, Result<&str, QueryError>)]) -> Arc<dyn SiteQuery> {
        let payloads = entries
            .iter()
            .map(|(site, outcome)| {
                let outcome = match outcome {
                    Ok(json) => Ok(json.as_bytes().to_vec()),
                    Err(err) => Err(err.clone()),
                };
                (site.to_string(), outcome)
            })
            .collect();
        Arc::new(Self { payloads })
    }
}

#[async_trait::async_trait]
impl SiteQuery for ScriptedQuery {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn query(&self, site: &Site, _kind: ResourceKind) -> Result<Vec<u8>, QueryError> {
        match self.payloads.get(&site.id) {
            Some(outcome) => outcome.clone(),
            None => Err(QueryError::Unreachable("not scripted".to_string())),
        }
    }
}

fn fleet(ids: &[&str]) -> SiteRegistry {
    SiteRegistry::new(
        ids.iter()
            .map(|id| {
                let host = id.trim_start_matches('@').replace('.', "-");
                Site::new(*id, format!("https://{host}.example"))
            })
            .collect(),
    )
    .unwrap()
}

#[tokio::test]
async fn unreachable_site_caps_presence_at_partial() {
    let registry = fleet(&["@alpha.prod", "@beta.prod", "@gamma.prod"]);
    let query = ScriptedQuery::new(&[
        ("@alpha.prod", Ok(r##"{"node": {"#enabled": true}}"##)),
        ("@beta.prod", Ok(r##"{"node": {"#enabled": true}}"##)),
        (
            "@gamma.prod",
            Err(QueryError::Unreachable("connection refused".to_string())),
        ),
    ]);

    let dataset = run(
        &registry,
        ResourceKind::Extensions,
        &EngineConfig::default(),
        query,
    )
    .await
    .unwrap();

    assert_eq!(dataset.failures.len(), 1);
    assert_eq!(dataset.failures[0].site_id, "@gamma.prod");
    assert!(dataset.failures[0].error.contains("unreachable"));

    // Enabled on every responding site, but the failed site keeps the
    // denominator at three.
    assert_eq!(
        dataset.presence["node"],
        PresenceStatus::Partial(vec!["ALPHA".to_string(), "BETA".to_string()])
    );
}

#[tokio::test]
async fn malformed_payload_is_a_failure_not_a_crash() {
    let registry = fleet(&["@alpha.prod", "@beta.prod"]);
    let query = ScriptedQuery::new(&[
        ("@alpha.prod", Ok(r##"{"node": {"#enabled": true}}"##)),
        ("@beta.prod", Ok(r##"["not", "records"]"##)),
    ]);

    let dataset = run(
        &registry,
        ResourceKind::Extensions,
        &EngineConfig::default(),
        query,
    )
    .await
    .unwrap();

    assert_eq!(dataset.failures.len(), 1);
    assert_eq!(dataset.failures[0].site_id, "@beta.prod");
    assert_eq!(dataset.presence["node"], PresenceStatus::Partial(vec!["ALPHA".to_string()]));
}

#[tokio::test]
async fn divergent_attribute_keeps_first_seen_value() {
    // @alpha sorts before @beta, so its value wins the fold.
    let registry = fleet(&["@beta.prod", "@alpha.prod"]);
    let query = ScriptedQuery::new(&[
        (
            "@alpha.prod",
            Ok(r##"{"node": {"#enabled": true, "#version": "10.1"}}"##),
        ),
        (
            "@beta.prod",
            Ok(r##"{"node": {"#enabled": true, "#version": "10.2"}}"##),
        ),
    ]);

    let dataset = run(
        &registry,
        ResourceKind::Extensions,
        &EngineConfig::default(),
        query,
    )
    .await
    .unwrap();

    assert_eq!(
        dataset.per_key["node"].attributes["#version"],
        ScalarValue::Text("10.1".to_string())
    );
    assert_eq!(dataset.divergences.len(), 1);
    let entry = &dataset.divergences[0];
    assert_eq!(entry.path, "node");
    assert_eq!(entry.attribute, "#version");
    assert_eq!(entry.existing, ScalarValue::Text("10.1".to_string()));
    assert_eq!(entry.incoming, ScalarValue::Text("10.2".to_string()));
}

#[tokio::test]
async fn priority_groups_shape_display_order() {
    let registry = fleet(&["@alpha.prod"]);
    let query = ScriptedQuery::new(&[(
        "@alpha.prod",
        Ok(r##"{
            "m_one": {"#enabled": true, "#category": "Zeta"},
            "m_two": {"#enabled": true, "#category": "Alpha"},
            "m_three": {"#enabled": true, "#category": "Zeta"}
        }"##),
    )]);

    let config = EngineConfig {
        priority_groups: vec!["Alpha".to_string()],
        ..EngineConfig::default()
    };
    let dataset = run(&registry, ResourceKind::Extensions, &config, query)
        .await
        .unwrap();

    assert_eq!(dataset.display_order, vec!["m_two", "m_one", "m_three"]);
}
