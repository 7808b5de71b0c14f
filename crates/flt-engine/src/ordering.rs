//! Display ordering with priority groups.

/// Order items by a configured group precedence.
///
/// Items whose group label appears in `priority_groups` come first,
/// sorted by (priority index, sub label); the rest follow, sorted by
/// (group label, sub label). The sort is stable, so callers wanting
/// full determinism on (group, sub) ties should carry a unique
/// tertiary key in `sub`.
pub fn priority_grouping_sort<T, F>(items: Vec<T>, priority_groups: &[String], key: F) -> Vec<T>
where
    F: Fn(&T) -> (String, String),
{
    let position = |group: &str| priority_groups.iter().position(|g| g == group);

    let (mut matched, mut rest): (Vec<T>, Vec<T>) = items
        .into_iter()
        .partition(|item| position(&key(item).0).is_some());

    matched.sort_by(|a, b| {
        let (ga, sa) = key(a);
        let (gb, sb) = key(b);
        position(&ga)
            .cmp(&position(&gb))
            .then_with(|| sa.cmp(&sb))
    });

    rest.sort_by(|a, b| {
        let (ga, sa) = key(a);
        let (gb, sb) = key(b);
        ga.cmp(&gb).then_with(|| sa.cmp(&sb))
    });

    matched.extend(rest);
    matched
}
