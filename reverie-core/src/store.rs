//! Concept store: owns concept vectors and the directed relation graph.
//!
//! The store is a plain single-owner value. Shared access goes through
//! [`crate::network::SemanticNetwork`], which serialises writers.

use crate::concept::{
    Concept, ConceptSpec, Relation, clip_unit, cosine_similarity, random_vector, validate_vector,
};
use crate::error::{NetworkError, NetworkResult, ensure_unit};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Structural parameters of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Vector width shared by every concept
    pub dim_vector: usize,
    /// Merge rate used when `relate` hits an existing relation
    pub learning_increment: f32,
    /// Maximum archived vectors per concept
    pub vector_history_len: usize,
    /// Strength under which a concept counts as weak
    pub concept_floor: f32,
    /// Weight under which a relation counts as weak
    pub relation_floor: f32,
    /// Age units a concept or relation may stay weak before pruning removes it
    pub retention_window: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dim_vector: 64,
            learning_increment: 0.5,
            vector_history_len: 8,
            concept_floor: 0.05,
            relation_floor: 0.02,
            retention_window: 20,
        }
    }
}

impl StoreConfig {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] for the first value out of range.
    pub fn validate(&self) -> NetworkResult<()> {
        if self.dim_vector == 0 {
            return Err(NetworkError::invalid_parameter(
                "dim_vector",
                "must be greater than zero",
            ));
        }
        ensure_unit("learning_increment", self.learning_increment)?;
        ensure_unit("concept_floor", self.concept_floor)?;
        ensure_unit("relation_floor", self.relation_floor)?;
        Ok(())
    }
}

/// Outcome of a decay pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecayReport {
    /// Concepts whose strength was multiplied by the decay factor
    pub decayed_concepts: usize,
    /// Relations whose weight was multiplied by the decay factor
    pub decayed_relations: usize,
    /// What the trailing prune removed
    pub pruned: PruneReport,
}

/// Outcome of a prune pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PruneReport {
    /// Removed concept names, sorted
    pub removed_concepts: Vec<String>,
    /// Removed relations as (source, target), sorted
    pub removed_relations: Vec<(String, String)>,
}

impl PruneReport {
    /// Whether nothing was removed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed_concepts.is_empty() && self.removed_relations.is_empty()
    }
}

/// Owner of all concepts and relations
#[derive(Debug, Clone)]
pub struct ConceptStore {
    config: StoreConfig,
    concepts: BTreeMap<String, Concept>,
    // source -> target -> relation
    relations: BTreeMap<String, BTreeMap<String, Relation>>,
    age: u64,
}

impl ConceptStore {
    /// Create an empty store.
    ///
    /// # Errors
    ///
    /// Fails when the configuration does not validate.
    pub fn new(config: StoreConfig) -> NetworkResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            concepts: BTreeMap::new(),
            relations: BTreeMap::new(),
            age: 0,
        })
    }

    /// Store configuration
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Vector width
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.config.dim_vector
    }

    /// Current store age
    #[must_use]
    pub const fn age(&self) -> u64 {
        self.age
    }

    /// Advance the store age by one unit and return the new age
    pub fn tick(&mut self) -> u64 {
        self.age = self.age.saturating_add(1);
        self.age
    }

    pub(crate) fn set_age(&mut self, age: u64) {
        self.age = age;
    }

    /// Number of concepts
    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the store has no concepts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Whether a concept with this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    /// Register a curated concept with default strength and category.
    ///
    /// A missing vector is drawn uniformly from [-1, 1]^D.
    ///
    /// # Errors
    ///
    /// [`NetworkError::DuplicateConcept`] if the name is taken, or a vector
    /// validation error.
    pub fn add_concept<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        vector: Option<Vec<f32>>,
        rng: &mut R,
    ) -> NetworkResult<&Concept> {
        let mut spec = ConceptSpec::new(name);
        spec.vector = vector;
        self.add_concept_with(spec, rng)
    }

    /// Register a concept from a full spec.
    ///
    /// # Errors
    ///
    /// Same as [`ConceptStore::add_concept`].
    pub fn add_concept_with<R: Rng + ?Sized>(
        &mut self,
        spec: ConceptSpec,
        rng: &mut R,
    ) -> NetworkResult<&Concept> {
        if self.concepts.contains_key(&spec.name) {
            return Err(NetworkError::DuplicateConcept { name: spec.name });
        }
        let base = self.resolve_vector(&spec, rng)?;
        let name = spec.name.clone();
        let concept = Concept::new(spec, base, self.age);
        debug!(
            target: "reverie::store",
            concept = %name,
            category = %concept.category,
            "registered concept"
        );
        Ok(self.concepts.entry(name).or_insert(concept))
    }

    /// Overwrite an existing concept's vector and metadata, keeping its relations.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownConcept`] when there is nothing to replace.
    pub fn replace_concept<R: Rng + ?Sized>(
        &mut self,
        spec: ConceptSpec,
        rng: &mut R,
    ) -> NetworkResult<&Concept> {
        if !self.concepts.contains_key(&spec.name) {
            return Err(NetworkError::unknown(spec.name));
        }
        let base = self.resolve_vector(&spec, rng)?;
        let name = spec.name.clone();
        let concept = Concept::new(spec, base, self.age);
        debug!(target: "reverie::store", concept = %name, "replaced concept");
        self.concepts.insert(name.clone(), concept);
        self.get(&name)
    }

    fn resolve_vector<R: Rng + ?Sized>(
        &self,
        spec: &ConceptSpec,
        rng: &mut R,
    ) -> NetworkResult<Vec<f32>> {
        match &spec.vector {
            Some(vector) => {
                validate_vector(&spec.name, vector, self.dim())?;
                Ok(vector.clone())
            }
            None => Ok(random_vector(self.dim(), rng)),
        }
    }

    /// Look up a concept.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownConcept`] if absent.
    pub fn get(&self, name: &str) -> NetworkResult<&Concept> {
        self.concepts
            .get(name)
            .ok_or_else(|| NetworkError::unknown(name))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> NetworkResult<&mut Concept> {
        self.concepts
            .get_mut(name)
            .ok_or_else(|| NetworkError::unknown(name))
    }

    /// All concepts in name order
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// All relations in (source, target) order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values().flat_map(BTreeMap::values)
    }

    /// Number of relations
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.values().map(BTreeMap::len).sum()
    }

    /// Relation from `source` to `target`, if any
    #[must_use]
    pub fn relation(&self, source: &str, target: &str) -> Option<&Relation> {
        self.relations.get(source).and_then(|out| out.get(target))
    }

    pub(crate) fn relation_mut(&mut self, source: &str, target: &str) -> Option<&mut Relation> {
        self.relations
            .get_mut(source)
            .and_then(|out| out.get_mut(target))
    }

    pub(crate) fn insert_concept(&mut self, concept: Concept) {
        self.concepts.insert(concept.name.clone(), concept);
    }

    pub(crate) fn insert_relation(&mut self, relation: Relation) {
        self.relations
            .entry(relation.source.clone())
            .or_default()
            .insert(relation.target.clone(), relation);
    }

    /// Create or merge a directed relation.
    ///
    /// New relations take `weight` directly. Existing ones move toward it by
    /// `learning_increment`, so repeating the same call converges.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidWeight`] for self loops or weights outside
    /// [0, 1]; [`NetworkError::UnknownConcept`] for unregistered endpoints.
    pub fn relate(
        &mut self,
        source: &str,
        target: &str,
        weight: f32,
        context: &str,
    ) -> NetworkResult<f32> {
        if source == target {
            return Err(NetworkError::InvalidWeight {
                source_name: source.to_string(),
                target: target.to_string(),
                reason: "self loops are not allowed".to_string(),
            });
        }
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(NetworkError::InvalidWeight {
                source_name: source.to_string(),
                target: target.to_string(),
                reason: format!("weight {weight} is outside [0, 1]"),
            });
        }
        self.get(source)?;
        self.get(target)?;

        let age = self.age;
        let increment = self.config.learning_increment;
        let floor = self.config.relation_floor;
        let merged = match self.relation_mut(source, target) {
            Some(relation) => {
                let old = relation.weight;
                relation.set_weight(increment.mul_add(weight - old, old));
                relation.last_reinforced_at = age;
                refresh_weakness(&mut relation.weak_since, relation.weight, floor, age);
                relation.weight
            }
            None => {
                let mut relation = Relation::new(
                    source.to_string(),
                    target.to_string(),
                    weight,
                    age,
                    context.to_string(),
                );
                refresh_weakness(&mut relation.weak_since, relation.weight, floor, age);
                let created = relation.weight;
                self.insert_relation(relation);
                created
            }
        };
        debug!(
            target: "reverie::store",
            source,
            target,
            weight = merged,
            "related concepts"
        );
        Ok(merged)
    }

    /// Outgoing neighbors sorted by weight descending, ties by target name.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownConcept`] if `name` is not registered.
    pub fn neighbors(&self, name: &str) -> NetworkResult<Vec<(String, f32)>> {
        self.get(name)?;
        let mut out: Vec<(String, f32)> = self
            .relations
            .get(name)
            .map(|targets| {
                targets
                    .values()
                    .map(|r| (r.target.clone(), r.weight))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }

    /// Number of outgoing relations of a concept; zero for unknown names
    #[must_use]
    pub fn out_degree(&self, name: &str) -> usize {
        self.relations.get(name).map_or(0, BTreeMap::len)
    }

    /// Up to `k` concepts whose base vectors are most similar to `vector`.
    ///
    /// Callers use this to resolve fuzzy input to seed names before activating.
    ///
    /// # Errors
    ///
    /// [`NetworkError::DimensionMismatch`] when `vector` has the wrong width.
    pub fn nearest_concepts(&self, vector: &[f32], k: usize) -> NetworkResult<Vec<(String, f32)>> {
        validate_vector("query", vector, self.dim())?;
        let mut scored: Vec<(String, f32)> = self
            .concepts
            .values()
            .map(|c| (c.name.clone(), cosine_similarity(vector, &c.base_vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Refresh the vectors and counters of every visited concept, in trace order.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownConcept`] if the trace names a missing concept;
    /// nothing is touched in that case.
    pub fn record_visits<R: Rng + ?Sized>(
        &mut self,
        trace: &[String],
        uncertainty_base: f32,
        rng: &mut R,
    ) -> NetworkResult<()> {
        if let Some(missing) = trace.iter().find(|name| !self.contains(name)) {
            return Err(NetworkError::unknown(missing.as_str()));
        }
        let age = self.age;
        let history_len = self.config.vector_history_len;
        for name in trace {
            let concept = self.get_mut(name)?;
            concept.refresh_vector(uncertainty_base, history_len, rng);
            concept.activation_count = concept.activation_count.saturating_add(1);
            concept.last_activated_at = Some(age);
        }
        Ok(())
    }

    /// Decay idle concepts and relations, then prune anything weak for too long.
    ///
    /// A concept is idle when more than `idle_threshold` age units passed since
    /// its last activation (or creation). A relation is idle when more than
    /// `idle_threshold` units passed since it was last reinforced.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] if `decay_factor` is outside [0, 1].
    pub fn decay_unused(
        &mut self,
        decay_factor: f32,
        idle_threshold: u64,
    ) -> NetworkResult<DecayReport> {
        ensure_unit("decay_factor", decay_factor)?;
        let age = self.age;
        let mut report = DecayReport::default();

        let concept_floor = self.config.concept_floor;
        for concept in self.concepts.values_mut() {
            if age.saturating_sub(concept.last_active_at()) > idle_threshold {
                concept.strength = clip_unit(concept.strength * decay_factor);
                report.decayed_concepts += 1;
            }
            refresh_weakness(&mut concept.weak_since, concept.strength, concept_floor, age);
        }

        let relation_floor = self.config.relation_floor;
        for relation in self.relations.values_mut().flat_map(BTreeMap::values_mut) {
            if age.saturating_sub(relation.last_reinforced_at) > idle_threshold {
                relation.set_weight(relation.weight * decay_factor);
                report.decayed_relations += 1;
            }
            refresh_weakness(&mut relation.weak_since, relation.weight, relation_floor, age);
        }

        report.pruned = self.prune();
        debug!(
            target: "reverie::store",
            decayed_concepts = report.decayed_concepts,
            decayed_relations = report.decayed_relations,
            "decay pass complete"
        );
        Ok(report)
    }

    /// Remove concepts and relations that stayed under their floor for at
    /// least `retention_window` age units. Removing a concept drops every
    /// relation touching it.
    pub fn prune(&mut self) -> PruneReport {
        let age = self.age;
        let window = self.config.retention_window;
        let expired = |weak_since: Option<u64>| {
            weak_since.is_some_and(|since| age.saturating_sub(since) >= window)
        };

        let removed_concepts: Vec<String> = self
            .concepts
            .values()
            .filter(|c| expired(c.weak_since))
            .map(|c| c.name.clone())
            .collect();
        for name in &removed_concepts {
            self.concepts.remove(name);
        }

        let mut removed_relations = Vec::new();
        for (source, targets) in &mut self.relations {
            let source_gone = removed_concepts.binary_search(source).is_ok();
            targets.retain(|target, relation| {
                let keep = !source_gone
                    && removed_concepts.binary_search(target).is_err()
                    && !expired(relation.weak_since);
                if !keep {
                    removed_relations.push((source.clone(), target.clone()));
                }
                keep
            });
        }
        self.relations.retain(|_, targets| !targets.is_empty());

        let report = PruneReport {
            removed_concepts,
            removed_relations,
        };
        if !report.is_empty() {
            info!(
                target: "reverie::store",
                concepts = report.removed_concepts.len(),
                relations = report.removed_relations.len(),
                "pruned weak graph elements"
            );
        }
        report
    }
}

/// Track when a value first dropped under its floor; clear once it recovers.
pub(crate) fn refresh_weakness(weak_since: &mut Option<u64>, value: f32, floor: f32, age: u64) {
    if value < floor {
        weak_since.get_or_insert(age);
    } else {
        *weak_since = None;
    }
}
