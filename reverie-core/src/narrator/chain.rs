//! Chain-building state machine: `Seed -> Expanding -> Converged | Terminated`.

use crate::activation::ActivationOutcome;
use crate::error::{NetworkError, NetworkResult, ensure_non_negative, ensure_unit};
use crate::store::ConceptStore;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Tuning for chain building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainParams {
    /// Chain length at which building stops
    pub target_length: usize,
    /// Zero picks greedily; higher values flatten the choice distribution
    pub temperature: f32,
    /// Candidates below this activation are not eligible
    pub min_activation: f32,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            target_length: 6,
            temperature: 0.1,
            min_activation: 0.05,
        }
    }
}

impl ChainParams {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] for the first value out of range.
    pub fn validate(&self) -> NetworkResult<()> {
        if self.target_length == 0 {
            return Err(NetworkError::invalid_parameter(
                "target_length",
                "must be at least 1",
            ));
        }
        ensure_non_negative("temperature", self.temperature)?;
        ensure_unit("min_activation", self.min_activation)
    }
}

/// Where a chain is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    /// Holds only the seeds
    Seed,
    /// Still growing
    Expanding,
    /// Ran out of eligible neighbors before reaching the target length
    Converged,
    /// Reached the target length
    Terminated,
}

impl ChainState {
    /// Whether no further steps can happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Terminated)
    }
}

/// An ordered sequence of concepts read off an activation map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtChain {
    /// Concepts in chain order, seeds first
    pub concepts: Vec<String>,
    /// Activation of each concept, aligned with `concepts`
    pub activations: Vec<f32>,
    /// Final state
    pub state: ChainState,
}

impl ThoughtChain {
    /// Number of concepts
    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

impl fmt::Display for ThoughtChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.concepts.join(" -> "))
    }
}

/// Builds [`ThoughtChain`]s from propagation results
#[derive(Debug, Clone, Default)]
pub struct ThoughtChainBuilder {
    params: ChainParams,
}

impl ThoughtChainBuilder {
    /// Create a builder.
    ///
    /// # Errors
    ///
    /// Fails when the parameters do not validate.
    pub fn new(params: ChainParams) -> NetworkResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters in use
    #[must_use]
    pub const fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Walk from the last seed through activated neighbors.
    ///
    /// Only neighbors present in the activation map at or above
    /// `min_activation` and not already in the chain are eligible. The chain
    /// never exceeds `target_length`; surplus seeds are dropped from the end.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownConcept`] if the outcome references a concept
    /// the store no longer holds.
    pub fn build<R: Rng + ?Sized>(
        &self,
        store: &ConceptStore,
        outcome: &ActivationOutcome,
        rng: &mut R,
    ) -> NetworkResult<ThoughtChain> {
        let mut concepts = outcome.seeds.clone();
        concepts.truncate(self.params.target_length);
        let mut visited: BTreeSet<String> = concepts.iter().cloned().collect();
        let mut state = ChainState::Seed;

        while !state.is_terminal() {
            if concepts.len() >= self.params.target_length {
                state = ChainState::Terminated;
                break;
            }
            let Some(current) = concepts.last() else {
                state = ChainState::Converged;
                break;
            };

            let mut candidates: Vec<(String, f32)> = store
                .neighbors(current)?
                .into_iter()
                .filter(|(name, _)| !visited.contains(name))
                .filter_map(|(name, _)| {
                    outcome
                        .activation
                        .get(&name)
                        .copied()
                        .filter(|a| *a >= self.params.min_activation)
                        .map(|a| (name, a))
                })
                .collect();
            if candidates.is_empty() {
                state = ChainState::Converged;
                break;
            }
            candidates.sort_by(|a, b| a.0.cmp(&b.0));

            let next = self.choose(&candidates, rng);
            visited.insert(next.clone());
            concepts.push(next);
            state = ChainState::Expanding;
        }

        let activations = concepts
            .iter()
            .map(|name| outcome.activation_of(name))
            .collect();
        Ok(ThoughtChain {
            concepts,
            activations,
            state,
        })
    }

    /// Pick from name-sorted candidates.
    fn choose<R: Rng + ?Sized>(&self, candidates: &[(String, f32)], rng: &mut R) -> String {
        let greedy = || {
            candidates
                .iter()
                .fold(None::<&(String, f32)>, |best, item| match best {
                    Some(b) if b.1 >= item.1 => Some(b),
                    _ => Some(item),
                })
                .map(|(name, _)| name.clone())
                .unwrap_or_default()
        };
        if self.params.temperature == 0.0 {
            return greedy();
        }

        let exponent = 1.0 / self.params.temperature;
        let weights: Vec<f32> = candidates.iter().map(|(_, a)| a.powf(exponent)).collect();
        let total: f32 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return greedy();
        }
        let mut roll = rng.gen_range(0.0..total);
        for ((name, _), weight) in candidates.iter().zip(&weights) {
            if roll < *weight {
                return name.clone();
            }
            roll -= weight;
        }
        greedy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{ActivationMap, ActivationOutcome};
    use crate::store::StoreConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn outcome(seeds: &[&str], pairs: &[(&str, f32)]) -> ActivationOutcome {
        let mut activation: ActivationMap = seeds.iter().map(|s| (s.to_string(), 1.0)).collect();
        activation.extend(pairs.iter().map(|(n, a)| (n.to_string(), *a)));
        ActivationOutcome {
            seeds: seeds.iter().map(ToString::to_string).collect(),
            trace: activation.keys().cloned().collect(),
            activation,
            rounds: 1,
            truncated: false,
        }
    }

    fn star() -> ConceptStore {
        let mut rng = StdRng::seed_from_u64(8);
        let mut store = ConceptStore::new(StoreConfig {
            dim_vector: 2,
            ..StoreConfig::default()
        })
        .unwrap();
        for name in ["s", "x", "y", "z"] {
            store.add_concept(name, None, &mut rng).unwrap();
        }
        store.relate("s", "x", 0.5, "").unwrap();
        store.relate("s", "y", 0.5, "").unwrap();
        store.relate("x", "z", 0.5, "").unwrap();
        store
    }

    fn greedy(target_length: usize) -> ThoughtChainBuilder {
        ThoughtChainBuilder::new(ChainParams {
            target_length,
            temperature: 0.0,
            min_activation: 0.05,
        })
        .unwrap()
    }

    #[test]
    fn greedy_follows_highest_activation() {
        let store = star();
        let mut rng = StdRng::seed_from_u64(0);
        let o = outcome(&["s"], &[("x", 0.4), ("y", 0.6), ("z", 0.2)]);
        let chain = greedy(5).build(&store, &o, &mut rng).unwrap();
        // y has no outgoing edges, so the walk stops there
        assert_eq!(chain.concepts, vec!["s", "y"]);
        assert_eq!(chain.state, ChainState::Converged);
    }

    #[test]
    fn ties_break_lexicographically() {
        let store = star();
        let mut rng = StdRng::seed_from_u64(0);
        let o = outcome(&["s"], &[("x", 0.5), ("y", 0.5), ("z", 0.3)]);
        let chain = greedy(3).build(&store, &o, &mut rng).unwrap();
        assert_eq!(chain.concepts, vec!["s", "x", "z"]);
        assert_eq!(chain.state, ChainState::Terminated);
        assert_eq!(chain.to_string(), "s -> x -> z");
    }

    #[test]
    fn unactivated_neighbors_are_ignored() {
        let store = star();
        let mut rng = StdRng::seed_from_u64(0);
        let o = outcome(&["s"], &[("x", 0.01)]);
        let chain = greedy(4).build(&store, &o, &mut rng).unwrap();
        assert_eq!(chain.concepts, vec!["s"]);
        assert_eq!(chain.state, ChainState::Converged);
    }

    #[test]
    fn seeds_alone_can_terminate() {
        let store = star();
        let mut rng = StdRng::seed_from_u64(0);
        let o = outcome(&["s", "x"], &[]);
        let chain = greedy(2).build(&store, &o, &mut rng).unwrap();
        assert_eq!(chain.state, ChainState::Terminated);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn surplus_seeds_are_cut_to_target_length() {
        let store = star();
        let mut rng = StdRng::seed_from_u64(0);
        let o = outcome(&["s", "x", "y"], &[("z", 0.4)]);
        let chain = greedy(2).build(&store, &o, &mut rng).unwrap();
        assert_eq!(chain.concepts, vec!["s", "x"]);
        assert_eq!(chain.activations.len(), 2);
        assert_eq!(chain.state, ChainState::Terminated);
    }

    #[test]
    fn stochastic_choice_stays_eligible() {
        let store = star();
        let builder = ThoughtChainBuilder::new(ChainParams {
            target_length: 2,
            temperature: 1.0,
            min_activation: 0.05,
        })
        .unwrap();
        let o = outcome(&["s"], &[("x", 0.5), ("y", 0.5)]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chain = builder.build(&store, &o, &mut rng).unwrap();
            assert!(chain.concepts[1] == "x" || chain.concepts[1] == "y");
        }
    }

    #[test]
    fn zero_length_rejected() {
        assert!(ThoughtChainBuilder::new(ChainParams {
            target_length: 0,
            ..ChainParams::default()
        })
        .is_err());
    }
}
