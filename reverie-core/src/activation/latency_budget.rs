use std::time::{Duration, Instant};

/// Wall-clock guard for a single propagation run.
#[derive(Debug, Clone, Copy)]
pub struct LatencyBudget {
    started: Instant,
    budget: Option<Duration>,
}

impl LatencyBudget {
    /// Start the clock. `None` never expires.
    #[must_use]
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Time since the run started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the run has used up its budget
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.budget.is_some_and(|budget| self.elapsed() >= budget)
    }
}
