//! Append-only log of finished thoughts with bounded retention.

use super::chain::ThoughtChain;
use super::emergence::UnexpectedConnection;
use crate::modifier::ReinforcementReport;
use serde::Serialize;
use std::collections::VecDeque;

/// One completed thinking cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thought {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Store age when the cycle ran
    pub age: u64,
    /// Seeds the cycle started from
    pub seeds: Vec<String>,
    /// Chain read off the activation map
    pub chain: ThoughtChain,
    /// Cross-category links surfaced during the cycle
    pub unexpected: Vec<UnexpectedConnection>,
    /// Relation writes made by reinforcement
    pub reinforcement: ReinforcementReport,
    /// Name of the concept minted at the end of the cycle, if any
    pub synthesized: Option<String>,
}

/// Bounded history; the oldest thoughts are evicted first
#[derive(Debug, Clone, Serialize)]
pub struct ThoughtLog<T = Thought> {
    capacity: usize,
    entries: VecDeque<T>,
    evicted: u64,
}

impl<T> ThoughtLog<T> {
    /// Log that keeps at most `capacity` entries. Zero keeps nothing but still counts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
            evicted: 0,
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&mut self, entry: T) {
        if self.capacity == 0 {
            self.evicted = self.evicted.saturating_add(1);
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted = self.evicted.saturating_add(1);
        }
        self.entries.push_back(entry);
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Most recent entry
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Entries currently retained
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries dropped by the retention policy so far
    #[must_use]
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Maximum retained entries
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
