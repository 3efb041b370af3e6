//! Scoring activated relations for surprise.

use crate::activation::ActivationMap;
use crate::category::Category;
use crate::store::ConceptStore;
use serde::{Deserialize, Serialize};

/// A relation between two activated concepts that crosses categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnexpectedConnection {
    /// Relation source
    pub source: String,
    /// Relation target
    pub target: String,
    /// Category of the source
    pub source_category: Category,
    /// Category of the target
    pub target_category: Category,
    /// `1 / (1 + co-occurrences)` for cross-category pairs
    pub novelty: f32,
    /// Sum of both endpoints' activation
    pub activation: f32,
}

/// Score every relation whose endpoints were both activated and return the
/// `k` most novel.
///
/// Novelty is `1 / (1 + cooccurrence_count)` when the categories differ and
/// zero otherwise; zero scores are dropped. Ordering: novelty descending, then
/// combined activation descending, then source and target names.
#[must_use]
pub fn detect_unexpected_connections(
    store: &ConceptStore,
    activation: &ActivationMap,
    k: usize,
) -> Vec<UnexpectedConnection> {
    let mut found: Vec<UnexpectedConnection> = store
        .relations()
        .filter_map(|relation| {
            let a = activation.get(&relation.source)?;
            let b = activation.get(&relation.target)?;
            let source_category = store.get(&relation.source).ok()?.category;
            let target_category = store.get(&relation.target).ok()?.category;
            if source_category == target_category {
                return None;
            }
            Some(UnexpectedConnection {
                source: relation.source.clone(),
                target: relation.target.clone(),
                source_category,
                target_category,
                novelty: 1.0 / (1.0 + relation.cooccurrence_count as f32),
                activation: a + b,
            })
        })
        .collect();

    found.sort_by(|x, y| {
        y.novelty
            .total_cmp(&x.novelty)
            .then_with(|| y.activation.total_cmp(&x.activation))
            .then_with(|| x.source.cmp(&y.source))
            .then_with(|| x.target.cmp(&y.target))
    });
    found.truncate(k);
    found
}
