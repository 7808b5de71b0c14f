use flt_snapshot::NormalizedRecord;

use crate::types::DivergenceEntry;

/// Fold `incoming` into `accumulator`, appending divergence evidence.
///
/// Rules, per attribute key:
/// - present in both with equal values: no-op
/// - present in both with differing values: keep the accumulator's
///   value, append a [`DivergenceEntry`]
/// - only in incoming: copy into the accumulator
///
/// Per child key:
/// - only in incoming: insert the incoming subtree unchanged
/// - in both: recurse with the path extended by the child key
///
/// `path` is the slash-joined location of `accumulator` (the resource
/// key at the top level).
pub fn merge_into(
    accumulator: &mut NormalizedRecord,
    incoming: &NormalizedRecord,
    path: &str,
    divergences: &mut Vec<DivergenceEntry>,
) {
    for (attr, incoming_value) in &incoming.attributes {
        match accumulator.attributes.get(attr) {
            None => {
                accumulator
                    .attributes
                    .insert(attr.clone(), incoming_value.clone());
            }
            Some(existing) if existing == incoming_value => {}
            Some(existing) => {
                tracing::warn!(
                    %path,
                    attribute = %attr,
                    existing = %existing.display(),
                    incoming = %incoming_value.display(),
                    "attribute differs across sites"
                );
                divergences.push(DivergenceEntry {
                    path: path.to_string(),
                    attribute: attr.clone(),
                    existing: existing.clone(),
                    incoming: incoming_value.clone(),
                });
            }
        }
    }

    for (name, incoming_child) in &incoming.children {
        match accumulator.children.get_mut(name) {
            None => {
                accumulator
                    .children
                    .insert(name.clone(), incoming_child.clone());
            }
            Some(existing_child) => {
                let child_path = format!("{path}/{name}");
                merge_into(existing_child, incoming_child, &child_path, divergences);
            }
        }
    }
}
