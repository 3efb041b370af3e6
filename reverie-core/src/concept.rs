//! Concept and relation records plus the vector arithmetic they rely on.

use crate::category::Category;
use crate::error::{NetworkError, NetworkResult};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// A named, vector-valued node of the semantic graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique key within a store
    pub name: String,
    /// Fixed representation of the concept
    pub base_vector: Vec<f32>,
    /// Base vector plus the noise drawn on the last activation
    pub current_vector: Vec<f32>,
    /// Previous current vectors, oldest first
    pub vector_history: VecDeque<Vec<f32>>,
    /// Store age at registration
    pub created_at: u64,
    /// Number of propagation runs that visited this concept
    pub activation_count: u64,
    /// Store age of the last visit
    pub last_activated_at: Option<u64>,
    /// Decaying salience in [0, 1]
    pub strength: f32,
    /// Category used for novelty scoring
    pub category: Category,
    /// Parent names, non-empty only for synthesized concepts
    pub parents: BTreeSet<String>,
    /// Store age at which strength first fell under the concept floor
    pub weak_since: Option<u64>,
}

impl Concept {
    pub(crate) fn new(spec: ConceptSpec, base_vector: Vec<f32>, created_at: u64) -> Self {
        Self {
            name: spec.name,
            current_vector: base_vector.clone(),
            base_vector,
            vector_history: VecDeque::new(),
            created_at,
            activation_count: 0,
            last_activated_at: None,
            strength: spec.strength.clamp(0.0, 1.0),
            category: spec.category,
            parents: spec.parents,
            weak_since: None,
        }
    }

    /// Whether the synthesizer created this concept
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        !self.parents.is_empty()
    }

    /// Age of the most recent activity: last visit, or creation if never visited
    #[must_use]
    pub fn last_active_at(&self) -> u64 {
        self.last_activated_at.unwrap_or(self.created_at)
    }

    /// Replace the current vector with `base + N(0, scale)` and archive the old one.
    pub(crate) fn refresh_vector<R: Rng + ?Sized>(
        &mut self,
        scale: f32,
        history_len: usize,
        rng: &mut R,
    ) {
        let next = add_noise(&self.base_vector, scale, rng);
        let previous = std::mem::replace(&mut self.current_vector, next);
        if history_len == 0 {
            return;
        }
        self.vector_history.push_back(previous);
        while self.vector_history.len() > history_len {
            self.vector_history.pop_front();
        }
    }
}

/// Registration request for a concept
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptSpec {
    /// Unique name
    pub name: String,
    /// Base vector; drawn at random when absent
    pub vector: Option<Vec<f32>>,
    /// Initial strength, clamped to [0, 1]
    pub strength: f32,
    /// Category
    pub category: Category,
    /// Parents for synthesized concepts
    pub parents: BTreeSet<String>,
}

impl ConceptSpec {
    /// Curated concept with full strength and unknown category
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vector: None,
            strength: 1.0,
            category: Category::Unknown,
            parents: BTreeSet::new(),
        }
    }

    /// Set an explicit base vector
    #[must_use]
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Set the category
    #[must_use]
    pub const fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the initial strength
    #[must_use]
    pub const fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Record parent names
    #[must_use]
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }
}

/// Directed weighted edge between two concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Source concept
    pub source: String,
    /// Target concept
    pub target: String,
    /// Weight in [0, 1]
    pub weight: f32,
    /// Store age when the relation was created
    pub discovery_age: u64,
    /// Store age of the last reinforcement or merge
    pub last_reinforced_at: u64,
    /// Free-form provenance tag
    pub context: String,
    /// Number of reinforcement windows that saw this pair together
    pub cooccurrence_count: u64,
    /// Store age at which weight first fell under the relation floor
    pub weak_since: Option<u64>,
}

impl Relation {
    pub(crate) fn new(
        source: String,
        target: String,
        weight: f32,
        age: u64,
        context: String,
    ) -> Self {
        Self {
            source,
            target,
            weight: clip_unit(weight),
            discovery_age: age,
            last_reinforced_at: age,
            context,
            cooccurrence_count: 0,
            weak_since: None,
        }
    }

    /// Write a weight, clipping to [0, 1]
    pub(crate) fn set_weight(&mut self, weight: f32) {
        self.weight = clip_unit(weight);
    }
}

/// Clip to the unit interval; NaN maps to 0
#[must_use]
pub fn clip_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Reject vectors of the wrong length or with non-finite components.
///
/// # Errors
///
/// [`NetworkError::DimensionMismatch`] or [`NetworkError::InvalidVector`].
pub fn validate_vector(name: &str, vector: &[f32], dim: usize) -> NetworkResult<()> {
    if vector.len() != dim {
        return Err(NetworkError::DimensionMismatch {
            expected: dim,
            actual: vector.len(),
        });
    }
    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(NetworkError::InvalidVector {
            name: name.to_string(),
            index,
        });
    }
    Ok(())
}

/// Uniform random vector in [-1, 1]^dim
pub fn random_vector<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Vec<f32> {
    (0..dim).map(|_| rng.gen_range(-1.0f32..=1.0)).collect()
}

/// `vector + N(0, scale)` per component. A zero scale copies the vector without drawing.
pub fn add_noise<R: Rng + ?Sized>(vector: &[f32], scale: f32, rng: &mut R) -> Vec<f32> {
    if scale <= 0.0 || !scale.is_finite() {
        return vector.to_vec();
    }
    match Normal::new(0.0f32, scale) {
        Ok(normal) => vector.iter().map(|v| v + normal.sample(rng)).collect(),
        Err(_) => vector.to_vec(),
    }
}

/// Weighted mean of equally sized vectors. Falls back to a plain mean when all weights are zero.
#[must_use]
pub fn weighted_average(vectors: &[&[f32]], weights: &[f32]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let total: f32 = weights.iter().sum();
    let uniform = total <= f32::EPSILON;
    let mut out = vec![0.0f32; first.len()];
    for (i, vector) in vectors.iter().enumerate() {
        let w = if uniform {
            1.0 / vectors.len() as f32
        } else {
            weights.get(i).copied().unwrap_or(0.0) / total
        };
        for (acc, v) in out.iter_mut().zip(vector.iter()) {
            *acc += w * v;
        }
    }
    out
}

/// Cosine similarity; zero when either vector has no magnitude
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Euclidean distance
#[must_use]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn history_is_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut concept = Concept::new(ConceptSpec::new("mar"), vec![0.5; 4], 0);
        for _ in 0..10 {
            concept.refresh_vector(0.1, 3, &mut rng);
        }
        assert_eq!(concept.vector_history.len(), 3);
        assert_eq!(concept.current_vector.len(), 4);
        assert_ne!(concept.current_vector, concept.base_vector);
    }

    #[test]
    fn zero_noise_keeps_base() {
        let mut rng = StdRng::seed_from_u64(1);
        let v = add_noise(&[1.0, -2.0], 0.0, &mut rng);
        assert_eq!(v, vec![1.0, -2.0]);
    }

    #[test]
    fn validate_reports_first_bad_index() {
        assert!(matches!(
            validate_vector("x", &[0.0, f32::NAN, f32::INFINITY], 3),
            Err(NetworkError::InvalidVector { index: 1, .. })
        ));
        assert!(matches!(
            validate_vector("x", &[0.0], 3),
            Err(NetworkError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn weighted_average_respects_weights() {
        let a = [0.0f32, 0.0];
        let b = [1.0f32, 2.0];
        let mean = weighted_average(&[&a, &b], &[1.0, 3.0]);
        assert!((mean[0] - 0.75).abs() < 1e-6);
        assert!((mean[1] - 1.5).abs() < 1e-6);

        let uniform = weighted_average(&[&a, &b], &[0.0, 0.0]);
        assert!((uniform[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_and_distance() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn clip_handles_nan() {
        assert_eq!(clip_unit(f32::NAN), 0.0);
        assert_eq!(clip_unit(1.5), 1.0);
        assert_eq!(clip_unit(-0.5), 0.0);
    }
}
