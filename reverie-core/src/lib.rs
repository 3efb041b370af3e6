//! Reverie: a self-modifying fuzzy semantic network.
//!
//! Concepts carry noisy vectors and are linked by weighted directed
//! relations. Activation spreads stochastically from seed concepts, the
//! co-activation trace reinforces the graph it ran on, new concepts are
//! synthesized from active parents, and an ordered thought chain is read off
//! each run.
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use reverie_core::{ConceptSpec, NetworkConfig, SemanticNetwork};
//!
//! # fn main() -> reverie_core::NetworkResult<()> {
//! let mut rng = StdRng::seed_from_u64(7);
//! let net = SemanticNetwork::new(NetworkConfig::default())?;
//! net.add_concept(ConceptSpec::new("ocean"), &mut rng)?;
//! net.add_concept(ConceptSpec::new("wave"), &mut rng)?;
//! net.relate("ocean", "wave", 0.8, "curated")?;
//! let thought = net.think(&["ocean"], false, &mut rng)?;
//! println!("{}", thought.chain);
//! # Ok(())
//! # }
//! ```

#![warn(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo
)]
#![deny(clippy::unwrap_in_result, clippy::panic_in_result_fn)]
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::float_cmp
    )
)]

pub mod activation;
pub mod category;
pub mod concept;
pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod modifier;
pub mod narrator;
pub mod network;
pub mod snapshot;
pub mod store;
pub mod synthesis;

pub use activation::{ActivationMap, ActivationOutcome, ActivationParams, ActivationPropagator};
pub use category::{Category, CategoryTable};
pub use concept::{Concept, ConceptSpec, Relation};
pub use config::NetworkConfig;
pub use error::{NetworkError, NetworkResult};
pub use export::{GraphLink, GraphMetrics, GraphNode, GraphView};
pub use metrics::{MetricsSnapshot, NetworkMetrics};
pub use modifier::{AutoModifier, ModifierParams, ReinforcementReport};
pub use narrator::{
    ChainParams, ChainState, Thought, ThoughtChain, ThoughtChainBuilder, ThoughtLog,
    UnexpectedConnection, detect_unexpected_connections,
};
pub use network::SemanticNetwork;
pub use snapshot::{FileSnapshotSink, MemorySnapshotSink, Snapshot, SnapshotSink};
pub use store::{ConceptStore, DecayReport, PruneReport, StoreConfig};
pub use synthesis::{ConceptSynthesizer, SynthesisParams};
