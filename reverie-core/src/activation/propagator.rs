//! Bounded round-based propagation with max aggregation and an energy budget.

use super::{ActivationMap, ActivationOutcome, ActivationParams, LatencyBudget};
use crate::concept::clip_unit;
use crate::error::{NetworkError, NetworkResult};
use crate::store::ConceptStore;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Spreads activation from seed concepts through weighted relations
#[derive(Debug, Clone, Default)]
pub struct ActivationPropagator {
    params: ActivationParams,
}

impl ActivationPropagator {
    /// Create a propagator.
    ///
    /// # Errors
    ///
    /// Fails when the parameters do not validate.
    pub fn new(params: ActivationParams) -> NetworkResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters in use
    #[must_use]
    pub const fn params(&self) -> &ActivationParams {
        &self.params
    }

    /// Compute activation without touching the store.
    ///
    /// Every round, each concept whose activation exceeds `prune_threshold`
    /// pushes `activation * weight * jitter` to its targets. Several pushes
    /// into one target keep the maximum. The round's pushes are scaled down
    /// together if they exceed `energy_budget`, pushes under `cutoff` are
    /// dropped, and the rest merge into the map by maximum. Seeds stay at 1.0.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidSeeds`] for an empty seed list and
    /// [`NetworkError::UnknownConcept`] for any seed the store lacks.
    pub fn propagate<S, R>(
        &self,
        store: &ConceptStore,
        seeds: &[S],
        rng: &mut R,
    ) -> NetworkResult<ActivationOutcome>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let seeds = resolve_seeds(store, seeds)?;
        let params = &self.params;
        let seed_set: BTreeSet<&str> = seeds.iter().map(String::as_str).collect();

        let mut activation: ActivationMap = seeds.iter().map(|s| (s.clone(), 1.0)).collect();
        let mut trace = seeds.clone();
        let mut rounds = 0;
        let mut truncated = false;
        let budget = LatencyBudget::start(params.time_budget);

        while rounds < params.depth {
            if budget.exhausted() {
                truncated = true;
                warn!(
                    target: "reverie::activation",
                    rounds,
                    elapsed_ms = budget.elapsed().as_millis() as u64,
                    "time budget exceeded during spreading"
                );
                break;
            }

            let mut incoming: BTreeMap<String, f32> = BTreeMap::new();
            for (source, &level) in &activation {
                if level <= params.prune_threshold {
                    continue;
                }
                for (target, weight) in store.neighbors(source)? {
                    if seed_set.contains(target.as_str()) {
                        continue;
                    }
                    let pushed = clip_unit(level * weight * self.jitter(rng));
                    incoming
                        .entry(target)
                        .and_modify(|current| *current = current.max(pushed))
                        .or_insert(pushed);
                }
            }
            rounds += 1;

            let total: f32 = incoming.values().sum();
            if total > params.energy_budget {
                let scale = params.energy_budget / total;
                incoming.values_mut().for_each(|v| *v *= scale);
            }

            let mut fresh: Vec<(String, f32)> = Vec::new();
            let mut changed = false;
            for (name, value) in incoming {
                if value < params.cutoff {
                    continue;
                }
                match activation.get_mut(&name) {
                    Some(existing) => {
                        if value > *existing {
                            *existing = value;
                            changed = true;
                        }
                    }
                    None => {
                        activation.insert(name.clone(), value);
                        fresh.push((name, value));
                        changed = true;
                    }
                }
            }
            fresh.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            trace.extend(fresh.into_iter().map(|(name, _)| name));

            if !changed {
                break;
            }
        }

        debug!(
            target: "reverie::activation",
            seeds = seeds.len(),
            activated = activation.len(),
            rounds,
            truncated,
            "propagation finished"
        );

        Ok(ActivationOutcome {
            seeds,
            activation,
            trace,
            rounds,
            truncated,
        })
    }

    /// Propagate, then refresh the vectors and counters of every visited concept.
    ///
    /// # Errors
    ///
    /// Same as [`ActivationPropagator::propagate`]; the store is untouched on error.
    pub fn activate<S, R>(
        &self,
        store: &mut ConceptStore,
        seeds: &[S],
        rng: &mut R,
    ) -> NetworkResult<ActivationOutcome>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let outcome = self.propagate(store, seeds, rng)?;
        store.record_visits(&outcome.trace, self.params.uncertainty_base, rng)?;
        Ok(outcome)
    }

    fn jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.params.temperature == 0.0 {
            return 1.0;
        }
        let z: f32 = StandardNormal.sample(rng);
        self.params.temperature.mul_add(z, 1.0).max(0.0)
    }
}

/// Deduplicate seeds in order and check each one exists.
fn resolve_seeds<S: AsRef<str>>(store: &ConceptStore, seeds: &[S]) -> NetworkResult<Vec<String>> {
    if seeds.is_empty() {
        return Err(NetworkError::InvalidSeeds {
            reason: "at least one seed concept is required".to_string(),
        });
    }
    let mut seen = BTreeSet::new();
    let mut resolved = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let name = seed.as_ref();
        store.get(name)?;
        if seen.insert(name) {
            resolved.push(name.to_string());
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn chain_store() -> ConceptStore {
        let mut rng = StdRng::seed_from_u64(11);
        let mut store = ConceptStore::new(StoreConfig {
            dim_vector: 3,
            ..StoreConfig::default()
        })
        .unwrap();
        for name in ["A", "B", "C", "D"] {
            store.add_concept(name, None, &mut rng).unwrap();
        }
        store.relate("A", "B", 0.8, "").unwrap();
        store.relate("B", "C", 0.5, "").unwrap();
        store
    }

    fn deterministic(depth: usize) -> ActivationPropagator {
        ActivationPropagator::new(ActivationParams {
            depth,
            temperature: 0.0,
            ..ActivationParams::default()
        })
        .unwrap()
    }

    #[test]
    fn spreads_along_chain() {
        let store = chain_store();
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = deterministic(2).propagate(&store, &["A"], &mut rng).unwrap();
        let b = outcome.activation_of("B");
        let c = outcome.activation_of("C");
        assert!(b > c && c > 0.0);
        assert!((b - 0.8).abs() < 1e-6);
        assert!((c - 0.4).abs() < 1e-6);
        assert!(!outcome.activation.contains_key("D"));
        assert_eq!(outcome.trace, vec!["A", "B", "C"]);
    }

    #[test]
    fn depth_zero_returns_seeds() {
        let store = chain_store();
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = deterministic(0).propagate(&store, &["A"], &mut rng).unwrap();
        assert_eq!(outcome.activation.len(), 1);
        assert_eq!(outcome.rounds, 0);
    }

    #[test]
    fn unknown_seed_is_fatal() {
        let store = chain_store();
        let mut rng = StdRng::seed_from_u64(0);
        let err = deterministic(2)
            .propagate(&store, &["A", "nowhere"], &mut rng)
            .unwrap_err();
        assert!(matches!(err, NetworkError::UnknownConcept { .. }));
        let empty: [&str; 0] = [];
        assert!(matches!(
            deterministic(2).propagate(&store, &empty, &mut rng),
            Err(NetworkError::InvalidSeeds { .. })
        ));
    }

    #[test]
    fn energy_budget_caps_a_round() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut store = ConceptStore::new(StoreConfig {
            dim_vector: 2,
            ..StoreConfig::default()
        })
        .unwrap();
        store.add_concept("hub", None, &mut rng).unwrap();
        for i in 0..10 {
            let name = format!("leaf{i}");
            store.add_concept(&name, None, &mut rng).unwrap();
            store.relate("hub", &name, 1.0, "").unwrap();
        }
        let propagator = ActivationPropagator::new(ActivationParams {
            depth: 1,
            temperature: 0.0,
            energy_budget: 2.0,
            ..ActivationParams::default()
        })
        .unwrap();
        let outcome = propagator.propagate(&store, &["hub"], &mut rng).unwrap();
        let non_seed: f32 = outcome
            .activation
            .iter()
            .filter(|(n, _)| n.as_str() != "hub")
            .map(|(_, v)| v)
            .sum();
        assert!(non_seed <= 2.0 + 1e-5);
        assert_eq!(outcome.activation.len(), 11);
    }

    #[test]
    fn activate_records_visits() {
        let mut store = chain_store();
        let mut rng = StdRng::seed_from_u64(2);
        deterministic(2).activate(&mut store, &["A"], &mut rng).unwrap();
        assert_eq!(store.get("C").unwrap().activation_count, 1);
        assert_eq!(store.get("D").unwrap().activation_count, 0);
        assert_eq!(store.get("A").unwrap().last_activated_at, Some(0));
    }

    #[test]
    fn negative_temperature_rejected() {
        assert!(
            ActivationPropagator::new(ActivationParams {
                temperature: -1.0,
                ..ActivationParams::default()
            })
            .is_err()
        );
    }
}
