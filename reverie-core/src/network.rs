//! Shared network facade: one writer, many readers, full thinking cycle.

use crate::activation::{ActivationMap, ActivationOutcome, ActivationPropagator};
use crate::category::{Category, CategoryTable};
use crate::concept::{Concept, ConceptSpec};
use crate::config::NetworkConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::export::GraphView;
use crate::metrics::{MetricsSnapshot, NetworkMetrics};
use crate::modifier::{AutoModifier, ReinforcementReport};
use crate::narrator::{
    Thought, ThoughtChainBuilder, ThoughtLog, UnexpectedConnection, detect_unexpected_connections,
};
use crate::snapshot::{Snapshot, SnapshotSink};
use crate::store::{ConceptStore, DecayReport, PruneReport};
use crate::synthesis::ConceptSynthesizer;
use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Semantic network shared between threads.
///
/// Reads (lookups, propagation, export, snapshot save) run concurrently.
/// Writes (relate, reinforcement, decay, synthesis, snapshot load, visit
/// bookkeeping) are serialised by the store lock. Propagation holds an
/// upgradable read guard so the visit bookkeeping that follows sees exactly
/// the graph it was computed on.
pub struct SemanticNetwork {
    config: NetworkConfig,
    store: Arc<RwLock<ConceptStore>>,
    categories: CategoryTable,
    propagator: ActivationPropagator,
    modifier: AutoModifier,
    synthesizer: ConceptSynthesizer,
    chain_builder: ThoughtChainBuilder,
    metrics: NetworkMetrics,
    thoughts: Mutex<ThoughtLog>,
}

impl SemanticNetwork {
    /// Empty network.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] if the configuration does not validate.
    pub fn new(config: NetworkConfig) -> NetworkResult<Self> {
        let store = ConceptStore::new(config.store_config())?;
        Self::with_store(config, store)
    }

    /// Network over an existing store.
    ///
    /// # Errors
    ///
    /// [`NetworkError::InvalidParameter`] if the configuration does not
    /// validate, or [`NetworkError::DimensionMismatch`] if the store was built
    /// for a different vector width.
    pub fn with_store(config: NetworkConfig, store: ConceptStore) -> NetworkResult<Self> {
        config.validate()?;
        if store.dim() != config.dim_vector {
            return Err(NetworkError::DimensionMismatch {
                expected: config.dim_vector,
                actual: store.dim(),
            });
        }
        Ok(Self {
            propagator: ActivationPropagator::new(config.activation_params())?,
            modifier: AutoModifier::new(config.modifier_params())?,
            synthesizer: ConceptSynthesizer::new(config.synthesis_params())?,
            chain_builder: ThoughtChainBuilder::new(config.chain_params())?,
            thoughts: Mutex::new(ThoughtLog::with_capacity(config.thought_log_capacity)),
            metrics: NetworkMetrics::default(),
            categories: CategoryTable::default(),
            store: Arc::new(RwLock::new(store)),
            config,
        })
    }

    /// Use `table` to resolve provenance tags in [`SemanticNetwork::add_tagged_concept`]
    #[must_use]
    pub fn with_categories(mut self, table: CategoryTable) -> Self {
        self.categories = table;
        self
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Run `f` against a consistent read view of the store.
    pub fn read<T>(&self, f: impl FnOnce(&ConceptStore) -> T) -> T {
        f(&self.store.read())
    }

    /// Register a concept.
    ///
    /// # Errors
    ///
    /// See [`ConceptStore::add_concept_with`].
    pub fn add_concept<R: Rng + ?Sized>(
        &self,
        spec: ConceptSpec,
        rng: &mut R,
    ) -> NetworkResult<Concept> {
        self.store.write().add_concept_with(spec, rng).cloned()
    }

    /// Register a concept whose category comes from a provenance tag.
    ///
    /// The category table is consulted first; a tag that names a category
    /// directly is accepted as well. Anything else is [`Category::Unknown`].
    ///
    /// # Errors
    ///
    /// See [`ConceptStore::add_concept_with`].
    pub fn add_tagged_concept<R: Rng + ?Sized>(
        &self,
        name: &str,
        tag: &str,
        vector: Option<Vec<f32>>,
        rng: &mut R,
    ) -> NetworkResult<Concept> {
        let category = match self.categories.lookup(tag) {
            Category::Unknown => tag.parse::<Category>().unwrap_or_default(),
            found => found,
        };
        let mut spec = ConceptSpec::new(name).with_category(category);
        spec.vector = vector;
        self.add_concept(spec, rng)
    }

    /// Create or merge a directed relation.
    ///
    /// # Errors
    ///
    /// See [`ConceptStore::relate`].
    pub fn relate(
        &self,
        source: &str,
        target: &str,
        weight: f32,
        context: &str,
    ) -> NetworkResult<f32> {
        self.store.write().relate(source, target, weight, context)
    }

    /// Copy of a concept.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownConcept`] if absent.
    pub fn get(&self, name: &str) -> NetworkResult<Concept> {
        self.store.read().get(name).cloned()
    }

    /// Outgoing neighbors by weight, descending.
    ///
    /// # Errors
    ///
    /// [`NetworkError::UnknownConcept`] if absent.
    pub fn neighbors(&self, name: &str) -> NetworkResult<Vec<(String, f32)>> {
        self.store.read().neighbors(name)
    }

    /// Concepts closest to `vector` by cosine similarity.
    ///
    /// # Errors
    ///
    /// [`NetworkError::DimensionMismatch`] for a vector of the wrong width.
    pub fn nearest_concepts(&self, vector: &[f32], k: usize) -> NetworkResult<Vec<(String, f32)>> {
        self.store.read().nearest_concepts(vector, k)
    }

    /// Spread activation from `seeds` without touching the store.
    ///
    /// # Errors
    ///
    /// See [`ActivationPropagator::propagate`].
    pub fn propagate<S, R>(&self, seeds: &[S], rng: &mut R) -> NetworkResult<ActivationOutcome>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        self.propagator.propagate(&self.store.read(), seeds, rng)
    }

    /// Spread activation from `seeds`, record the visits and advance the clock.
    ///
    /// # Errors
    ///
    /// See [`ActivationPropagator::propagate`]; the store is untouched on error.
    pub fn activate<S, R>(&self, seeds: &[S], rng: &mut R) -> NetworkResult<ActivationOutcome>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let guard = self.store.upgradable_read();
        let outcome = self.propagator.propagate(&guard, seeds, rng)?;
        let mut store = RwLockUpgradableReadGuard::upgrade(guard);
        store.record_visits(&outcome.trace, self.config.uncertainty_base, rng)?;
        store.tick();
        Ok(outcome)
    }

    /// Run one full cycle: propagate, build a chain, surface unexpected
    /// connections, reinforce co-activations and optionally synthesize a
    /// concept from the two most active chain participants.
    ///
    /// Synthesis is skipped when the chain has fewer than two concepts or the
    /// derived name is already taken.
    ///
    /// # Errors
    ///
    /// Propagation errors for bad seeds. Everything else is validated before
    /// the first write, so a failed cycle leaves the store unchanged.
    pub fn think<S, R>(&self, seeds: &[S], synthesize: bool, rng: &mut R) -> NetworkResult<Thought>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let guard = self.store.upgradable_read();
        let outcome = self.propagator.propagate(&guard, seeds, rng)?;
        let chain = self.chain_builder.build(&guard, &outcome, rng)?;
        let unexpected =
            detect_unexpected_connections(&guard, &outcome.activation, self.config.unexpected_top_k);
        let blend = if synthesize {
            synthesis_candidates(&outcome, &chain.concepts)
                .filter(|(_, name)| !guard.contains(name))
        } else {
            None
        };

        let mut store = RwLockUpgradableReadGuard::upgrade(guard);
        let age = store.age();
        store.record_visits(&outcome.trace, self.config.uncertainty_base, rng)?;
        let reinforcement =
            self.modifier
                .reinforce(&mut store, &outcome.trace, self.config.reinforce_window)?;
        let synthesized = match blend {
            Some((parents, name)) => {
                let concept = self.synthesizer.synthesize(
                    &mut store,
                    &parents,
                    self.config.uncertainty_base,
                    |_| name,
                    rng,
                )?;
                self.metrics.record_synthesis();
                Some(concept.name)
            }
            None => None,
        };
        store.tick();
        drop(store);

        let cycle = self.metrics.record_cycle();
        self.metrics
            .record_modifications(reinforcement.modifications());
        self.metrics.record_emergences(unexpected.len());
        if outcome.truncated {
            warn!(target: "reverie::network", cycle, "cycle ran on a truncated activation map");
        }
        info!(
            target: "reverie::network",
            cycle,
            chain = %chain,
            unexpected = unexpected.len(),
            modifications = reinforcement.modifications(),
            synthesized = synthesized.as_deref().unwrap_or("-"),
            "thought complete"
        );

        let thought = Thought {
            cycle,
            age,
            seeds: outcome.seeds,
            chain,
            unexpected,
            reinforcement,
            synthesized,
        };
        self.thoughts.lock().push(thought.clone());
        Ok(thought)
    }

    /// Reinforce co-occurrences in `trace` within `window` positions.
    ///
    /// # Errors
    ///
    /// See [`AutoModifier::reinforce`].
    pub fn reinforce(&self, trace: &[String], window: usize) -> NetworkResult<ReinforcementReport> {
        let report = self.modifier.reinforce(&mut self.store.write(), trace, window)?;
        self.metrics.record_modifications(report.modifications());
        Ok(report)
    }

    /// Maintenance decay with the configured factor and idle threshold.
    ///
    /// # Errors
    ///
    /// See [`ConceptStore::decay_unused`].
    pub fn decay_pass(&self) -> NetworkResult<DecayReport> {
        self.modifier.decay_pass(
            &mut self.store.write(),
            self.config.decay_factor,
            self.config.idle_threshold,
        )
    }

    /// Remove elements that stayed weak past the retention window
    pub fn prune(&self) -> PruneReport {
        self.store.write().prune()
    }

    /// Advance the store clock without activating anything
    pub fn tick(&self) -> u64 {
        self.store.write().tick()
    }

    /// Mint a concept from `parents`.
    ///
    /// # Errors
    ///
    /// See [`ConceptSynthesizer::synthesize`].
    pub fn synthesize<S, F, R>(
        &self,
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
        let concept =
            self.synthesizer
                .synthesize(&mut self.store.write(), parents, novelty, name_fn, rng)?;
        self.metrics.record_synthesis();
        Ok(concept)
    }

    /// Cross-category relations among the concepts in `activation`
    #[must_use]
    pub fn unexpected_connections(&self, activation: &ActivationMap) -> Vec<UnexpectedConnection> {
        detect_unexpected_connections(
            &self.store.read(),
            activation,
            self.config.unexpected_top_k,
        )
    }

    /// Render-ready view of the whole graph
    #[must_use]
    pub fn graph_view(&self, activation: Option<&ActivationMap>) -> GraphView {
        GraphView::build(&self.store.read(), activation, self.metrics.snapshot())
    }

    /// Current counter values
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Retained thoughts, oldest first
    #[must_use]
    pub fn thoughts(&self) -> Vec<Thought> {
        self.thoughts.lock().iter().cloned().collect()
    }

    /// Persist the store and the counters through `sink`.
    ///
    /// # Errors
    ///
    /// Serialisation or sink failures.
    pub fn save_snapshot(&self, sink: &dyn SnapshotSink) -> NetworkResult<()> {
        let bytes = Snapshot::capture(&self.store.read())
            .with_metrics(self.metrics.snapshot())
            .to_bytes()?;
        sink.put(&bytes)
    }

    /// Replace the store with the snapshot held by `sink`.
    ///
    /// The snapshot is restored into a staging store first and only swapped
    /// in once it validates completely. Counters saved with the snapshot
    /// replace the running ones. Returns `false` when the sink is empty.
    ///
    /// # Errors
    ///
    /// [`NetworkError::SnapshotCorrupt`] or sink failures; the live store is
    /// untouched in either case.
    pub fn load_snapshot(&self, sink: &dyn SnapshotSink) -> NetworkResult<bool> {
        let Some(bytes) = sink.get()? else {
            debug!(target: "reverie::network", "no snapshot to load");
            return Ok(false);
        };
        let snapshot = Snapshot::from_bytes(&bytes)?;
        let staged = snapshot.restore(self.config.store_config())?;
        let concepts = staged.len();
        *self.store.write() = staged;
        if let Some(counters) = snapshot.metrics {
            self.metrics.restore(counters);
        }
        info!(target: "reverie::network", concepts, "snapshot loaded");
        Ok(true)
    }
}

/// Pick two parents from the chain, most active non-seeds first, and derive
/// the synthesized concept's name from them.
fn synthesis_candidates(
    outcome: &ActivationOutcome,
    chain: &[String],
) -> Option<([String; 2], String)> {
    let mut ranked: Vec<&String> = chain.iter().collect();
    ranked.sort_by(|a, b| {
        outcome
            .is_seed(a)
            .cmp(&outcome.is_seed(b))
            .then_with(|| outcome.activation_of(b).total_cmp(&outcome.activation_of(a)))
            .then_with(|| a.cmp(b))
    });
    let [first, second, ..] = ranked.as_slice() else {
        return None;
    };
    let mut pair = [(*first).clone(), (*second).clone()];
    pair.sort();
    let name = format!("{}+{}", pair[0], pair[1]);
    Some((pair, name))
}
