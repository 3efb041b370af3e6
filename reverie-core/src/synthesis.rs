//! Minting new concepts by blending existing ones.

use crate::category::Category;
use crate::concept::{Concept, ConceptSpec, add_noise, weighted_average};
use crate::error::{NetworkError, NetworkResult, ensure_non_negative, ensure_unit};
use crate::store::ConceptStore;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Tuning for synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// Multiplier on the parents' mean strength; below 1 so offspring start weaker
    pub synthesis_penalty: f32,
    /// Weight of the relation from the new concept to each parent
    pub parent_relation_weight: f32,
    /// Provenance tag written on parent relations
    pub context: String,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            synthesis_penalty: 0.8,
            parent_relation_weight: 0.5,
            context: "synthesis".to_string(),
        }
    }
}

impl SynthesisParams {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] for the first value out of range.
    pub fn validate(&self) -> NetworkResult<()> {
        ensure_unit("synthesis_penalty", self.synthesis_penalty)?;
        ensure_unit("parent_relation_weight", self.parent_relation_weight)
    }
}

/// Creates concepts from two or more parents
#[derive(Debug, Clone, Default)]
pub struct ConceptSynthesizer {
    params: SynthesisParams,
}

impl ConceptSynthesizer {
    /// Create a synthesizer.
    ///
    /// # Errors
    ///
    /// Fails when the parameters do not validate.
    pub fn new(params: SynthesisParams) -> NetworkResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Blend `parents` into a new concept and relate it back to each parent.
    ///
    /// The base vector is the strength-weighted mean of the parents' base
    /// vectors plus `novelty * N(0, 1)` per component. Strength is the mean
    /// parent strength times `synthesis_penalty`. The caller names the concept
    /// through `name_fn`, which sees the parents in name order.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InsufficientParents`] with fewer than two distinct
    /// parents, [`NetworkError::UnknownConcept`] for a missing parent,
    /// [`NetworkError::DuplicateConcept`] if the chosen name is taken. The
    /// store is unchanged on error.
    pub fn synthesize<S, F, R>(
        &self,
        store: &mut ConceptStore,
        parents: &[S],
        novelty: f32,
        name_fn: F,
        rng: &mut R,
    ) -> NetworkResult<Concept>
    where
        S: AsRef<str>,
        F: FnOnce(&[&Concept]) -> String,
        R: Rng + ?Sized,
    {
        let distinct: BTreeSet<&str> = parents.iter().map(AsRef::as_ref).collect();
        if distinct.len() < 2 {
            return Err(NetworkError::InsufficientParents {
                distinct: distinct.len(),
            });
        }
        ensure_non_negative("novelty", novelty)?;

        let parent_concepts = distinct
            .iter()
            .map(|name| store.get(name))
            .collect::<NetworkResult<Vec<&Concept>>>()?;
        let name = name_fn(&parent_concepts);
        if store.contains(&name) {
            return Err(NetworkError::DuplicateConcept { name });
        }

        let vectors: Vec<&[f32]> = parent_concepts
            .iter()
            .map(|c| c.base_vector.as_slice())
            .collect();
        let strengths: Vec<f32> = parent_concepts.iter().map(|c| c.strength).collect();
        let centroid = weighted_average(&vectors, &strengths);
        let base = add_noise(&centroid, novelty, rng);
        let mean_strength = strengths.iter().sum::<f32>() / strengths.len() as f32;

        let spec = ConceptSpec::new(name.clone())
            .with_vector(base)
            .with_strength(mean_strength * self.params.synthesis_penalty)
            .with_category(Category::Synthesized)
            .with_parents(distinct.iter().copied());
        store.add_concept_with(spec, rng)?;

        for parent in &distinct {
            store.relate(
                &name,
                parent,
                self.params.parent_relation_weight,
                &self.params.context,
            )?;
        }

        info!(
            target: "reverie::synthesis",
            concept = %name,
            parents = distinct.len(),
            novelty,
            "synthesized concept"
        );
        store.get(&name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn store() -> ConceptStore {
        let mut rng = StdRng::seed_from_u64(4);
        let mut store = ConceptStore::new(StoreConfig {
            dim_vector: 3,
            ..StoreConfig::default()
        })
        .unwrap();
        store
            .add_concept("fire", Some(vec![1.0, 0.0, 0.0]), &mut rng)
            .unwrap();
        store
            .add_concept("water", Some(vec![0.0, 1.0, 0.0]), &mut rng)
            .unwrap();
        store
    }

    fn joined(parents: &[&Concept]) -> String {
        parents
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }

    #[test]
    fn offspring_is_weaker_and_related() {
        let mut store = store();
        let mut rng = StdRng::seed_from_u64(1);
        let child = ConceptSynthesizer::default()
            .synthesize(&mut store, &["water", "fire"], 0.0, joined, &mut rng)
            .unwrap();
        assert_eq!(child.name, "fire+water");
        assert!((child.strength - 0.8).abs() < 1e-6);
        assert_eq!(child.category, Category::Synthesized);
        assert!((child.base_vector[0] - 0.5).abs() < 1e-6);
        assert!(store.relation("fire+water", "fire").is_some());
        assert!(store.relation("fire+water", "water").is_some());
    }

    #[test]
    fn duplicate_parents_do_not_count() {
        let mut store = store();
        let mut rng = StdRng::seed_from_u64(1);
        let err = ConceptSynthesizer::default()
            .synthesize(&mut store, &["fire", "fire"], 0.1, joined, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::InsufficientParents { distinct: 1 }
        ));
    }

    #[test]
    fn name_collision_leaves_store_untouched() {
        let mut store = store();
        let mut rng = StdRng::seed_from_u64(1);
        let err = ConceptSynthesizer::default()
            .synthesize(
                &mut store,
                &["fire", "water"],
                0.1,
                |_| "fire".to_string(),
                &mut rng,
            )
            .unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateConcept { .. }));
        assert_eq!(store.len(), 2);
        assert_eq!(store.relation_count(), 0);
    }
}
