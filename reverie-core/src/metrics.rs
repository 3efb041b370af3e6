//! Running counters for a network.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by readers and the single writer
#[derive(Debug, Default)]
pub struct NetworkMetrics {
    cycles: AtomicU64,
    auto_modifications: AtomicU64,
    emergences: AtomicU64,
    syntheses: AtomicU64,
}

impl NetworkMetrics {
    /// Count a completed thinking cycle and return its number
    pub fn record_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count relation writes made by reinforcement
    pub fn record_modifications(&self, count: usize) {
        self.auto_modifications
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Count unexpected connections surfaced
    pub fn record_emergences(&self, count: usize) {
        self.emergences.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Count a synthesized concept
    pub fn record_synthesis(&self) {
        self.syntheses.fetch_add(1, Ordering::Relaxed);
    }

    /// Overwrite every counter with values carried over from a snapshot
    pub fn restore(&self, values: MetricsSnapshot) {
        self.cycles.store(values.cycles, Ordering::Relaxed);
        self.auto_modifications
            .store(values.auto_modifications, Ordering::Relaxed);
        self.emergences.store(values.emergences, Ordering::Relaxed);
        self.syntheses.store(values.syntheses, Ordering::Relaxed);
    }

    /// Point-in-time copy
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            auto_modifications: self.auto_modifications.load(Ordering::Relaxed),
            emergences: self.emergences.load(Ordering::Relaxed),
            syntheses: self.syntheses.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one moment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Completed thinking cycles
    pub cycles: u64,
    /// Relation writes made by reinforcement
    pub auto_modifications: u64,
    /// Unexpected connections surfaced
    pub emergences: u64,
    /// Concepts minted by synthesis
    pub syntheses: u64,
}
