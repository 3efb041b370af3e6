//! Stochastic spreading activation over the concept graph.
//!
//! Propagation is split in two: [`ActivationPropagator::propagate`] is a pure
//! read over the store and yields an [`ActivationOutcome`];
//! [`crate::store::ConceptStore::record_visits`] then applies the visit
//! bookkeeping. [`ActivationPropagator::activate`] runs both.

use crate::error::{NetworkError, NetworkResult, ensure_non_negative, ensure_unit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod latency_budget;
pub mod propagator;

pub use latency_budget::LatencyBudget;
pub use propagator::ActivationPropagator;

/// Activation score per concept name, ordered by name
pub type ActivationMap = BTreeMap<String, f32>;

/// Tuning for a propagation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationParams {
    /// Maximum number of spreading rounds
    pub depth: usize,
    /// Spread of the multiplicative Gaussian jitter; zero is fully deterministic
    pub temperature: f32,
    /// Sources at or below this activation do not spread
    pub prune_threshold: f32,
    /// Pushed amounts below this are dropped
    pub cutoff: f32,
    /// Upper bound on the summed non-seed activation pushed in one round
    pub energy_budget: f32,
    /// Noise scale applied to the vectors of visited concepts
    pub uncertainty_base: f32,
    /// Optional wall-clock guard; exceeded runs stop after the current round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget: Option<Duration>,
}

impl Default for ActivationParams {
    fn default() -> Self {
        Self {
            depth: 3,
            temperature: 0.1,
            prune_threshold: 0.05,
            cutoff: 0.01,
            energy_budget: 4.0,
            uncertainty_base: 0.05,
            time_budget: None,
        }
    }
}

impl ActivationParams {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] for the first value out of range.
    pub fn validate(&self) -> NetworkResult<()> {
        ensure_non_negative("temperature", self.temperature)?;
        ensure_unit("prune_threshold", self.prune_threshold)?;
        ensure_unit("cutoff", self.cutoff)?;
        ensure_non_negative("uncertainty_base", self.uncertainty_base)?;
        if !self.energy_budget.is_finite() || self.energy_budget <= 0.0 {
            return Err(NetworkError::invalid_parameter(
                "energy_budget",
                format!("expected a finite value > 0, got {}", self.energy_budget),
            ));
        }
        Ok(())
    }
}

/// Result of a propagation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationOutcome {
    /// Deduplicated seeds in the order they were given
    pub seeds: Vec<String>,
    /// Activation of every concept that received any
    pub activation: ActivationMap,
    /// Concepts in order of first activation
    pub trace: Vec<String>,
    /// Rounds actually executed
    pub rounds: usize,
    /// Whether the wall-clock guard cut the run short
    pub truncated: bool,
}

impl ActivationOutcome {
    /// Activation of `name`, zero if it was never reached
    #[must_use]
    pub fn activation_of(&self, name: &str) -> f32 {
        self.activation.get(name).copied().unwrap_or(0.0)
    }

    /// Whether `name` was one of the seeds
    #[must_use]
    pub fn is_seed(&self, name: &str) -> bool {
        self.seeds.iter().any(|s| s == name)
    }

    /// Up to `k` non-seed concepts with the highest activation, ties by name
    #[must_use]
    pub fn most_active(&self, k: usize) -> Vec<(String, f32)> {
        let mut ranked: Vec<(String, f32)> = self
            .activation
            .iter()
            .filter(|(name, _)| !self.is_seed(name))
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
    }
}
