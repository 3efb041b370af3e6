//! Hebbian reinforcement of co-activated concepts.

use crate::concept::Relation;
use crate::error::{NetworkError, NetworkResult, ensure_unit};
use crate::store::{ConceptStore, DecayReport, refresh_weakness};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Tuning for reinforcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierParams {
    /// Fraction of the remaining headroom `1 - w` added per reinforcement
    pub learning_rate: f32,
    /// Weight given to relations discovered through co-activation
    pub initial_new_edge_weight: f32,
    /// Provenance tag written on discovered relations
    pub context: String,
}

impl Default for ModifierParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            initial_new_edge_weight: 0.2,
            context: "co-activation".to_string(),
        }
    }
}

impl ModifierParams {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] for the first value out of range.
    pub fn validate(&self) -> NetworkResult<()> {
        ensure_unit("learning_rate", self.learning_rate)?;
        ensure_unit("initial_new_edge_weight", self.initial_new_edge_weight)
    }
}

/// What a reinforcement call changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReinforcementReport {
    /// Existing relations strengthened
    pub reinforced: usize,
    /// Relations created for previously unconnected pairs
    pub created: usize,
}

impl ReinforcementReport {
    /// Total number of relation writes
    #[must_use]
    pub const fn modifications(&self) -> usize {
        self.reinforced + self.created
    }
}

/// Rewrites relation weights from visitation traces
#[derive(Debug, Clone, Default)]
pub struct AutoModifier {
    params: ModifierParams,
}

impl AutoModifier {
    /// Create a modifier.
    ///
    /// # Errors
    ///
    /// Fails when the parameters do not validate.
    pub fn new(params: ModifierParams) -> NetworkResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters in use
    #[must_use]
    pub const fn params(&self) -> &ModifierParams {
        &self.params
    }

    /// Strengthen relations between concepts that co-occur within `window`
    /// positions of each other in `trace`, directed toward the later one.
    ///
    /// Existing relations move by `w + learning_rate * (1 - w)`; missing ones
    /// are created at `initial_new_edge_weight`. Each ordered pair is written
    /// at most once per call.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidTrace`] if `window` is zero or any name is
    /// unknown. Validation completes before any write, so a rejected trace
    /// leaves the store unchanged.
    pub fn reinforce(
        &self,
        store: &mut ConceptStore,
        trace: &[String],
        window: usize,
    ) -> NetworkResult<ReinforcementReport> {
        if window == 0 {
            return Err(NetworkError::invalid_trace("window must be at least 1"));
        }
        if let Some((position, name)) = trace
            .iter()
            .enumerate()
            .find(|(_, name)| !store.contains(name))
        {
            return Err(NetworkError::invalid_trace(format!(
                "unknown concept '{name}' at position {position}"
            )));
        }

        let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
        let mut ordered: Vec<(&str, &str)> = Vec::new();
        for (i, earlier) in trace.iter().enumerate() {
            for later in trace.iter().skip(i + 1).take(window) {
                if earlier != later && pairs.insert((earlier.as_str(), later.as_str())) {
                    ordered.push((earlier.as_str(), later.as_str()));
                }
            }
        }

        let age = store.age();
        let floor = store.config().relation_floor;
        let mut report = ReinforcementReport::default();
        for (source, target) in ordered {
            if let Some(relation) = store.relation_mut(source, target) {
                let w = relation.weight;
                relation.set_weight(self.params.learning_rate.mul_add(1.0 - w, w));
                relation.last_reinforced_at = age;
                relation.cooccurrence_count = relation.cooccurrence_count.saturating_add(1);
                refresh_weakness(&mut relation.weak_since, relation.weight, floor, age);
                report.reinforced += 1;
            } else {
                let mut relation = Relation::new(
                    source.to_string(),
                    target.to_string(),
                    self.params.initial_new_edge_weight,
                    age,
                    self.params.context.clone(),
                );
                relation.cooccurrence_count = 1;
                refresh_weakness(&mut relation.weak_since, relation.weight, floor, age);
                store.insert_relation(relation);
                report.created += 1;
            }
        }

        debug!(
            target: "reverie::modifier",
            trace_len = trace.len(),
            window,
            reinforced = report.reinforced,
            created = report.created,
            "reinforcement applied"
        );
        Ok(report)
    }

    /// Run maintenance decay on the store.
    ///
    /// # Errors
    ///
    /// See [`ConceptStore::decay_unused`].
    pub fn decay_pass(
        &self,
        store: &mut ConceptStore,
        decay_factor: f32,
        idle_threshold: u64,
    ) -> NetworkResult<DecayReport> {
        store.decay_unused(decay_factor, idle_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn store_with(names: &[&str]) -> ConceptStore {
        let mut rng = StdRng::seed_from_u64(9);
        let mut store = ConceptStore::new(StoreConfig {
            dim_vector: 2,
            ..StoreConfig::default()
        })
        .unwrap();
        for name in names {
            store.add_concept(name, None, &mut rng).unwrap();
        }
        store
    }

    fn trace(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn window_limits_pairs() {
        let mut store = store_with(&["a", "b", "c"]);
        let modifier = AutoModifier::default();
        let report = modifier
            .reinforce(&mut store, &trace(&["a", "b", "c"]), 1)
            .unwrap();
        assert_eq!(report.created, 2);
        assert!(store.relation("a", "b").is_some());
        assert!(store.relation("b", "c").is_some());
        assert!(store.relation("a", "c").is_none());
        assert!(store.relation("b", "a").is_none());
    }

    #[test]
    fn existing_edges_gain_headroom_fraction() {
        let mut store = store_with(&["a", "b"]);
        store.relate("a", "b", 0.5, "").unwrap();
        let modifier = AutoModifier::default();
        modifier
            .reinforce(&mut store, &trace(&["a", "b"]), 2)
            .unwrap();
        let w = store.relation("a", "b").unwrap().weight;
        assert!((w - 0.55).abs() < 1e-6);
        assert_eq!(store.relation("a", "b").unwrap().cooccurrence_count, 1);
    }

    #[test]
    fn invalid_trace_is_all_or_nothing() {
        let mut store = store_with(&["a", "b"]);
        let modifier = AutoModifier::default();
        let err = modifier
            .reinforce(&mut store, &trace(&["a", "b", "ghost"]), 2)
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidTrace { .. }));
        assert_eq!(store.relation_count(), 0);

        assert!(
            modifier
                .reinforce(&mut store, &trace(&["a", "b"]), 0)
                .is_err()
        );
        assert_eq!(store.relation_count(), 0);
    }

    #[test]
    fn saturated_edge_stays_put() {
        let mut store = store_with(&["a", "b"]);
        store.relate("a", "b", 1.0, "").unwrap();
        let modifier = AutoModifier::default();
        modifier
            .reinforce(&mut store, &trace(&["a", "b"]), 1)
            .unwrap();
        assert_eq!(store.relation("a", "b").unwrap().weight, 1.0);
    }

    #[test]
    fn repeated_pair_written_once_per_call() {
        let mut store = store_with(&["a", "b"]);
        let modifier = AutoModifier::default();
        let report = modifier
            .reinforce(&mut store, &trace(&["a", "b", "a", "b"]), 3)
            .unwrap();
        // a->b and b->a, each once
        assert_eq!(report.created, 2);
        assert_eq!(report.reinforced, 0);
    }
}
