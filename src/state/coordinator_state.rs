/// Coordinator state definitions
///
/// A run moves strictly forward through these states; it never goes back.
use std::fmt;

/// Lifecycle of a single crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    /// Start task queued, counters initialized, workers being spawned
    Seeding,

    /// Monitoring loop active: supervising workers and draining results
    Running,

    /// Stop signal raised; waiting for workers to exit
    Draining,

    /// All workers gone; queues discarded
    Stopped,
}

impl CoordinatorState {
    /// Returns true once the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    ///
    /// A run may skip `Running` when it is interrupted while seeding.
    pub fn can_transition_to(&self, next: CoordinatorState) -> bool {
        matches!(
            (self, next),
            (Self::Seeding, Self::Running)
                | (Self::Seeding, Self::Draining)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
