//! Condition groups for each relaxation phase.
//!
//! All helpers take the priority-ordered condition list by reference and
//! return fresh groups; inputs are never mutated.

use rand::Rng;
use std::collections::HashSet;

use crate::conditions::{Condition, PriorityKey, ANCHOR_VARIABLE};

/// Generic constraints appended to every condition group.
#[derive(Debug, Clone)]
pub struct GeneralConstraints {
    statement_ceiling: u64,
    entity_id: String,
}

impl GeneralConstraints {
    /// Ceiling is `round(condition_count * factor)`.
    pub fn new(entity_id: &str, condition_count: usize, factor: f64) -> Self {
        Self {
            statement_ceiling: (condition_count as f64 * factor).round() as u64,
            entity_id: entity_id.to_string(),
        }
    }

    pub fn statement_ceiling(&self) -> u64 {
        self.statement_ceiling
    }

    /// Render `group` and append the statement-count and self-match filters.
    pub fn apply(&self, group: &[Condition]) -> Vec<String> {
        let mut rendered: Vec<String> = group.iter().map(Condition::to_sparql).collect();
        rendered.push(format!("{} wikibase:statements ?statementCount .", ANCHOR_VARIABLE));
        rendered.push(format!(
            "FILTER(?statementCount < {}) .",
            self.statement_ceiling
        ));
        rendered.push(format!("FILTER({} != wd:{}) .", ANCHOR_VARIABLE, self.entity_id));
        rendered
    }
}

/// One group per condition, each missing exactly that condition. Empty groups are skipped.
pub fn drop_one_groups(conditions: &[Condition]) -> Vec<Vec<Condition>> {
    (0..conditions.len())
        .map(|skip| {
            conditions
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != skip)
                .map(|(_, c)| c.clone())
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Number of conditions to retain for `fraction`, or `None` when the fraction
/// adds nothing: it keeps every condition, or all but one (the drop-one phase).
///
/// `Some(0)` means this and every smaller fraction retain nothing.
pub fn dilution_target(total: usize, fraction: f64) -> Option<usize> {
    let target = (total as f64 * fraction).round() as usize;
    if target == 0 {
        return Some(0);
    }
    if target >= total || target + 1 == total {
        return None;
    }
    Some(target)
}

/// Keep-weight for the `position`-th of `total` priority-ordered conditions.
///
/// Rises linearly from 0.6 and integrates to roughly 1 over `[0, 1]`, so later
/// (less important) conditions are dropped more often while the expected
/// retained share stays near the fraction.
pub fn retention_weight(position: usize, total: usize) -> f64 {
    (position as f64 / total as f64) * 0.8f64.sqrt() + 0.6
}

/// Randomly keep each condition when `u * retention_weight < fraction`, `u` uniform in `[0, 1)`.
pub fn sample_subset<R: Rng + ?Sized>(
    conditions: &[Condition],
    fraction: f64,
    rng: &mut R,
) -> Vec<Condition> {
    let total = conditions.len();
    conditions
        .iter()
        .enumerate()
        .filter(|(position, _)| rng.gen::<f64>() * retention_weight(*position, total) < fraction)
        .map(|(_, c)| c.clone())
        .collect()
}

/// Groups for one dilution fraction: the `target` most important conditions,
/// then up to `samples` distinct non-empty random subsets.
pub fn dilution_groups<R: Rng + ?Sized>(
    conditions: &[Condition],
    target: usize,
    fraction: f64,
    samples: usize,
    rng: &mut R,
) -> Vec<Vec<Condition>> {
    let mut seen: HashSet<Vec<PriorityKey>> = HashSet::new();
    let mut groups = Vec::with_capacity(samples + 1);

    let prefix: Vec<Condition> = conditions.iter().take(target).cloned().collect();
    seen.insert(prefix.iter().map(|c| c.key).collect());
    groups.push(prefix);

    for _ in 0..samples {
        let subset = sample_subset(conditions, fraction, rng);
        if subset.is_empty() {
            continue;
        }
        if seen.insert(subset.iter().map(|c| c.key).collect()) {
            groups.push(subset);
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ConditionKind;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn conditions(count: usize) -> Vec<Condition> {
        (0..count)
            .map(|i| Condition {
                property: format!("P{}", i + 1),
                key: PriorityKey { importance: i, sequence: i as u64 },
                kind: ConditionKind::ValueRelevant { entity: format!("Q{}", i + 1) },
            })
            .collect()
    }

    fn properties(group: &[Condition]) -> Vec<&str> {
        group.iter().map(|c| c.property.as_str()).collect()
    }

    #[test]
    fn test_general_constraints() {
        let general = GeneralConstraints::new("Q42", 2, 1.25);
        assert_eq!(general.statement_ceiling(), 3);

        let rendered = general.apply(&conditions(2));
        assert_eq!(
            rendered,
            vec![
                "?item wdt:P1 wd:Q1 .",
                "?item wdt:P2 wd:Q2 .",
                "?item wikibase:statements ?statementCount .",
                "FILTER(?statementCount < 3) .",
                "FILTER(?item != wd:Q42) .",
            ]
        );
    }

    #[test]
    fn test_drop_one_groups() {
        let all = conditions(3);
        let groups = drop_one_groups(&all);
        assert_eq!(groups.len(), 3);
        assert_eq!(properties(&groups[0]), vec!["P2", "P3"]);
        assert_eq!(properties(&groups[1]), vec!["P1", "P3"]);
        assert_eq!(properties(&groups[2]), vec!["P1", "P2"]);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_drop_one_single_condition_is_empty() {
        assert!(drop_one_groups(&conditions(1)).is_empty());
    }

    #[test]
    fn test_dilution_target() {
        assert_eq!(dilution_target(20, 0.75), Some(15));
        assert_eq!(dilution_target(20, 0.2), Some(4));
        // 4 * 0.75 = 3 = all but one
        assert_eq!(dilution_target(4, 0.75), None);
        assert_eq!(dilution_target(1, 0.75), None);
        assert_eq!(dilution_target(1, 0.4), Some(0));
    }

    #[test]
    fn test_retention_weight_increases() {
        let weights: Vec<f64> = (0..10).map(|j| retention_weight(j, 10)).collect();
        assert!((weights[0] - 0.6).abs() < 1e-12);
        assert!(weights.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_subset_zero_draw_keeps_all() {
        let mut rng = StepRng::new(0, 0);
        let all = conditions(10);
        assert_eq!(sample_subset(&all, 0.2, &mut rng).len(), 10);
    }

    #[test]
    fn test_sample_subset_high_draw_keeps_most_important() {
        // u is just below 1.0: kept while retention_weight < fraction
        let mut rng = StepRng::new(u64::MAX, 0);
        let all = conditions(10);
        assert_eq!(properties(&sample_subset(&all, 0.75, &mut rng)), vec!["P1", "P2"]);
    }

    #[test]
    fn test_sample_subset_half_draw() {
        // u = 0.5: kept while retention_weight < 2 * fraction
        let mut rng = StepRng::new(1 << 63, 0);
        let all = conditions(10);
        assert_eq!(sample_subset(&all, 0.75, &mut rng).len(), 10);
        assert_eq!(properties(&sample_subset(&all, 0.4, &mut rng)), vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn test_dilution_groups_prefix_first_and_distinct() {
        let all = conditions(12);
        let mut rng = StdRng::seed_from_u64(7);
        let groups = dilution_groups(&all, 8, 0.65, 12, &mut rng);

        assert_eq!(groups[0], all[..8].to_vec());
        assert!(groups.len() <= 13);
        let distinct: HashSet<Vec<PriorityKey>> = groups
            .iter()
            .map(|g| g.iter().map(|c| c.key).collect())
            .collect();
        assert_eq!(distinct.len(), groups.len());
        for group in &groups {
            assert!(!group.is_empty());
            assert!(group.windows(2).all(|w| w[0].key < w[1].key));
        }
    }

    #[test]
    fn test_dilution_groups_deterministic_for_seed() {
        let all = conditions(12);
        let first = dilution_groups(&all, 5, 0.4, 12, &mut StdRng::seed_from_u64(99));
        let second = dilution_groups(&all, 5, 0.4, 12, &mut StdRng::seed_from_u64(99));
        assert_eq!(first, second);
    }

    #[test]
    fn test_dilution_groups_collapse_identical_samples() {
        // Constant draw yields the same subset every time
        let all = conditions(10);
        let mut rng = StepRng::new(u64::MAX, 0);
        let groups = dilution_groups(&all, 7, 0.75, 10, &mut rng);
        assert_eq!(groups.len(), 2);
        assert_eq!(properties(&groups[1]), vec!["P1", "P2"]);
    }
}
