//! Cross-source score reconciliation and ranking

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Deserialize;

use super::{SourceType, VectorResult};

/// How results with equal adjusted similarity are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep arrival order (backend registration order, then row order)
    #[default]
    Arrival,
    /// Order ties lexicographically by source id
    SourceId,
}

/// Per-source score adjustment applied before merging
///
/// Short-title ticket systems produce inflated raw similarity relative to
/// long-form sources, so their scores are discounted by a fixed multiplier.
#[derive(Debug, Clone)]
pub struct ScorePolicy {
    discounts: HashMap<SourceType, f32>,
    tie_break: TieBreak,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self::new().with_discount(SourceType::Jira, 0.6)
    }
}

impl ScorePolicy {
    /// Policy without any discounts
    pub fn new() -> Self {
        Self {
            discounts: HashMap::new(),
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_discount(mut self, source_type: SourceType, factor: f32) -> Self {
        self.discounts.insert(source_type, factor.clamp(0.0, 1.0));
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn discount_for(&self, source_type: SourceType) -> f32 {
        self.discounts.get(&source_type).copied().unwrap_or(1.0)
    }

    /// Apply the source discount to a single result
    pub fn adjust(&self, mut result: VectorResult) -> VectorResult {
        let factor = self.discount_for(result.source_type);

        if factor < 1.0 {
            result
                .metadata
                .insert("raw_similarity".to_string(), serde_json::json!(result.similarity));
            result.similarity = (result.similarity * factor).clamp(0.0, 1.0);
        }

        result
    }

    /// Adjust, sort descending, truncate, and flag expandable results
    pub fn rank(&self, results: Vec<VectorResult>, limit: usize) -> Vec<VectorResult> {
        let mut adjusted: Vec<VectorResult> = results.into_iter().map(|r| self.adjust(r)).collect();

        // sort_by is stable, so equal scores keep arrival order
        adjusted.sort_by(|a, b| {
            let by_score = b
                .similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal);

            match (by_score, self.tie_break) {
                (Ordering::Equal, TieBreak::SourceId) => a.source_id.cmp(&b.source_id),
                (ordering, _) => ordering,
            }
        });

        adjusted.truncate(limit);

        for result in &mut adjusted {
            result.expandable = result.source_type.supports_detail();
        }

        adjusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, source_type: SourceType, similarity: f32) -> VectorResult {
        VectorResult::new(id, format!("content {}", id), source_type, format!("src-{}", id), similarity)
    }

    #[test]
    fn test_jira_discount_reorders_merge() {
        let policy = ScorePolicy::default();
        let ranked = policy.rank(
            vec![
                result("ticket", SourceType::Jira, 0.9),
                result("page", SourceType::Wiki, 0.6),
            ],
            10,
        );

        assert_eq!(ranked[0].id, "page");
        assert_eq!(ranked[1].id, "ticket");
        assert!((ranked[1].similarity - 0.54).abs() < 1e-6);
        assert_eq!(
            ranked[1].metadata.get("raw_similarity"),
            Some(&serde_json::json!(0.9f32))
        );
    }

    #[test]
    fn test_discount_keeps_order_when_not_reversed() {
        let policy = ScorePolicy::default();
        let ranked = policy.rank(
            vec![
                result("page", SourceType::Wiki, 0.4),
                result("ticket", SourceType::Jira, 0.9),
            ],
            10,
        );

        assert_eq!(ranked[0].id, "ticket");
        assert_eq!(ranked[1].id, "page");
    }

    #[test]
    fn test_rank_truncates_and_sorts() {
        let policy = ScorePolicy::new();
        let input: Vec<VectorResult> = (0..8)
            .map(|i| result(&i.to_string(), SourceType::Git, (i as f32) / 10.0))
            .collect();

        let ranked = policy.rank(input, 3);

        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert_eq!(ranked[0].id, "7");
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let policy = ScorePolicy::new();
        let ranked = policy.rank(
            vec![
                result("first", SourceType::Git, 0.5),
                result("second", SourceType::Email, 0.5),
                result("third", SourceType::Knowledge, 0.5),
            ],
            10,
        );

        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_ties_by_source_id() {
        let policy = ScorePolicy::new().with_tie_break(TieBreak::SourceId);
        let ranked = policy.rank(
            vec![
                result("b", SourceType::Git, 0.5),
                result("a", SourceType::Git, 0.5),
            ],
            10,
        );

        assert_eq!(ranked[0].id, "a");
    }

    #[test]
    fn test_expandable_flags() {
        let policy = ScorePolicy::new();
        let ranked = policy.rank(
            vec![
                result("g", SourceType::Git, 0.9),
                result("m", SourceType::Metrics, 0.8),
            ],
            10,
        );

        assert!(ranked[0].expandable);
        assert!(!ranked[1].expandable);
    }
}
