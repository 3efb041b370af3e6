//! Flat network configuration and its mapping onto component parameters.

use crate::activation::ActivationParams;
use crate::error::{NetworkError, NetworkResult, ensure_unit};
use crate::modifier::ModifierParams;
use crate::narrator::ChainParams;
use crate::store::StoreConfig;
use crate::synthesis::SynthesisParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every recognised tuning option in one serialisable struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Vector width `D`
    pub dim_vector: usize,
    /// Noise scale applied to visited concepts' vectors
    pub uncertainty_base: f32,
    /// Stochastic spread for propagation and chain building
    pub temperature: f32,
    /// Propagation rounds
    pub depth: usize,
    /// Multiplier applied by maintenance decay
    pub decay_factor: f32,
    /// Age units without activity before decay applies
    pub idle_threshold: u64,
    /// Hebbian learning rate
    pub learning_rate: f32,
    /// Weight of relations discovered by co-activation
    pub initial_new_edge_weight: f32,
    /// Merge rate of repeated `relate` calls
    pub learning_increment: f32,
    /// Sources at or below this activation do not spread
    pub prune_threshold: f32,
    /// Pushed activation below this is dropped
    pub cutoff: f32,
    /// Maximum summed non-seed activation per round
    pub energy_budget: f32,
    /// Optional wall-clock guard on propagation, in milliseconds
    pub time_budget_ms: Option<u64>,
    /// Archived vectors kept per concept
    pub vector_history_len: usize,
    /// Strength floor for concepts
    pub concept_floor: f32,
    /// Weight floor for relations
    pub relation_floor: f32,
    /// Age units an element may stay under its floor before pruning
    pub retention_window: u64,
    /// Strength multiplier for synthesized concepts
    pub synthesis_penalty: f32,
    /// Weight of the relations from a synthesized concept to its parents
    pub parent_relation_weight: f32,
    /// Target chain length
    pub chain_length: usize,
    /// Minimum activation for a chain candidate
    pub min_chain_activation: f32,
    /// Co-occurrence window for reinforcement
    pub reinforce_window: usize,
    /// Unexpected connections kept per cycle
    pub unexpected_top_k: usize,
    /// Thoughts retained in the history log
    pub thought_log_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dim_vector: 64,
            uncertainty_base: 0.05,
            temperature: 0.1,
            depth: 3,
            decay_factor: 0.95,
            idle_threshold: 10,
            learning_rate: 0.1,
            initial_new_edge_weight: 0.2,
            learning_increment: 0.5,
            prune_threshold: 0.05,
            cutoff: 0.01,
            energy_budget: 4.0,
            time_budget_ms: None,
            vector_history_len: 8,
            concept_floor: 0.05,
            relation_floor: 0.02,
            retention_window: 20,
            synthesis_penalty: 0.8,
            parent_relation_weight: 0.5,
            chain_length: 6,
            min_chain_activation: 0.05,
            reinforce_window: 3,
            unexpected_top_k: 5,
            thought_log_capacity: 256,
        }
    }
}

impl NetworkConfig {
    /// Validate every option by building each component's parameters.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] for the first value out of range.
    pub fn validate(&self) -> NetworkResult<()> {
        self.store_config().validate()?;
        self.activation_params().validate()?;
        self.modifier_params().validate()?;
        self.synthesis_params().validate()?;
        self.chain_params().validate()?;
        ensure_unit("decay_factor", self.decay_factor)?;
        if self.reinforce_window == 0 {
            return Err(NetworkError::invalid_parameter(
                "reinforce_window",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Store parameters
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            dim_vector: self.dim_vector,
            learning_increment: self.learning_increment,
            vector_history_len: self.vector_history_len,
            concept_floor: self.concept_floor,
            relation_floor: self.relation_floor,
            retention_window: self.retention_window,
        }
    }

    /// Propagation parameters
    #[must_use]
    pub fn activation_params(&self) -> ActivationParams {
        ActivationParams {
            depth: self.depth,
            temperature: self.temperature,
            prune_threshold: self.prune_threshold,
            cutoff: self.cutoff,
            energy_budget: self.energy_budget,
            uncertainty_base: self.uncertainty_base,
            time_budget: self.time_budget_ms.map(Duration::from_millis),
        }
    }

    /// Reinforcement parameters
    #[must_use]
    pub fn modifier_params(&self) -> ModifierParams {
        ModifierParams {
            learning_rate: self.learning_rate,
            initial_new_edge_weight: self.initial_new_edge_weight,
            ..ModifierParams::default()
        }
    }

    /// Synthesis parameters
    #[must_use]
    pub fn synthesis_params(&self) -> SynthesisParams {
        SynthesisParams {
            synthesis_penalty: self.synthesis_penalty,
            parent_relation_weight: self.parent_relation_weight,
            ..SynthesisParams::default()
        }
    }

    /// Chain parameters
    #[must_use]
    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            target_length: self.chain_length,
            temperature: self.temperature,
            min_activation: self.min_chain_activation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        NetworkConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"dim_vector": 8, "temperature": 0.0}"#).unwrap();
        assert_eq!(config.dim_vector, 8);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.depth, NetworkConfig::default().depth);
    }

    #[test]
    fn out_of_range_is_named() {
        let config = NetworkConfig {
            learning_rate: 1.5,
            ..NetworkConfig::default()
        };
        match config.validate() {
            Err(NetworkError::InvalidParameter { name, .. }) => assert_eq!(name, "learning_rate"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn time_budget_maps_to_duration() {
        let config = NetworkConfig {
            time_budget_ms: Some(250),
            ..NetworkConfig::default()
        };
        assert_eq!(
            config.activation_params().time_budget,
            Some(Duration::from_millis(250))
        );
    }
}
