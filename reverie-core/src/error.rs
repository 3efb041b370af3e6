//! Error types for network operations.
//!
//! Every variant carries enough context to identify the offending input and a
//! suggestion for the caller, so a failure deep inside a thinking cycle still
//! reads well at the call site.

use thiserror::Error;

/// Errors surfaced by the semantic network
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A concept with this name is already registered
    #[error(
        "Concept '{name}' already exists\n  Suggestion: use replace_concept() to overwrite it explicitly"
    )]
    DuplicateConcept {
        /// Name that collided
        name: String,
    },

    /// A referenced concept is not registered in the store
    #[error(
        "Concept '{name}' not found\n  Suggestion: register it with add_concept() or resolve the name before calling"
    )]
    UnknownConcept {
        /// Name that failed to resolve
        name: String,
    },

    /// A relation weight was outside [0, 1], non-finite, or described a self loop
    #[error("Invalid relation {source_name} -> {target}: {reason}")]
    InvalidWeight {
        /// Relation source
        source_name: String,
        /// Relation target
        target: String,
        /// Why the write was rejected
        reason: String,
    },

    /// A vector did not match the store dimension
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\n  Suggestion: every concept in a store shares dim_vector"
    )]
    DimensionMismatch {
        /// Store dimension
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// A vector contained NaN or infinite components
    #[error("Vector for '{name}' contains a non-finite component at index {index}")]
    InvalidVector {
        /// Concept the vector was meant for
        name: String,
        /// First offending index
        index: usize,
    },

    /// Synthesis needs at least two distinct parents
    #[error(
        "Synthesis requires at least 2 distinct parents, got {distinct}\n  Suggestion: pass two or more different concept names"
    )]
    InsufficientParents {
        /// Number of distinct parent names supplied
        distinct: usize,
    },

    /// A visitation trace could not be used for reinforcement
    #[error("Invalid trace: {reason}")]
    InvalidTrace {
        /// First problem found while validating the trace
        reason: String,
    },

    /// Seeds passed to activation were unusable
    #[error("Invalid seeds: {reason}")]
    InvalidSeeds {
        /// Why the seed list was rejected
        reason: String,
    },

    /// A tuning parameter was outside its accepted range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in configuration
        name: &'static str,
        /// Accepted range or constraint
        reason: String,
    },

    /// Snapshot bytes failed validation; live state was not touched
    #[error(
        "Snapshot corrupt at {record}: {reason}\n  Suggestion: restore from an earlier snapshot; the loaded store is unchanged"
    )]
    SnapshotCorrupt {
        /// First invalid record, e.g. `concepts[3]` or `envelope`
        record: String,
        /// What was wrong with it
        reason: String,
    },

    /// Filesystem failure while reading or writing a snapshot
    #[error("Snapshot I/O failed for {path}")]
    Io {
        /// Path involved in the operation
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl NetworkError {
    /// Shorthand for [`NetworkError::UnknownConcept`]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownConcept { name: name.into() }
    }

    /// Shorthand for [`NetworkError::InvalidTrace`]
    pub fn invalid_trace(reason: impl Into<String>) -> Self {
        Self::InvalidTrace {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`NetworkError::InvalidParameter`]
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`NetworkError::SnapshotCorrupt`]
    pub fn corrupt(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SnapshotCorrupt {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Check that a tuning value lies in the closed unit interval.
pub(crate) fn ensure_unit(name: &'static str, value: f32) -> NetworkResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(NetworkError::invalid_parameter(
            name,
            format!("expected a value in [0, 1], got {value}"),
        ))
    }
}

/// Check that a tuning value is finite and non-negative.
pub(crate) fn ensure_non_negative(name: &'static str, value: f32) -> NetworkResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(NetworkError::invalid_parameter(
            name,
            format!("expected a finite value >= 0, got {value}"),
        ))
    }
}
