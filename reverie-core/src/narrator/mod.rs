//! Turning activation into ordered trains of thought.
//!
//! [`ThoughtChainBuilder`] walks the activation map from the seeds,
//! [`detect_unexpected_connections`] surfaces cross-category links, and
//! [`ThoughtLog`] keeps finished thoughts with bounded retention.

pub mod chain;
pub mod emergence;
pub mod history;

pub use chain::{ChainParams, ChainState, ThoughtChain, ThoughtChainBuilder};
pub use emergence::{UnexpectedConnection, detect_unexpected_connections};
pub use history::{Thought, ThoughtLog};
