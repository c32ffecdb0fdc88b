/// Run state definitions for tracking harvest progress
///
/// This module defines the lifecycle of a single harvest run.
use std::fmt;

/// Represents the current state of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    // ===== Active States =====
    /// Page range and checkpoint are being resolved
    Init,

    /// Pages are being fetched and extracted
    Running,

    // ===== Terminal States =====
    /// The whole page range was processed
    Completed,

    /// A shutdown signal stopped the run after flushing a checkpoint
    Interrupted,

    /// An unexpected error stopped the run after flushing a checkpoint
    Failed,
}

impl RunState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted | Self::Failed)
    }

    /// Returns true if the run is still in progress
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Init | Self::Running)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if moving from this state to `next` is allowed
    ///
    /// `Init` may fail before any page is fetched, but it may only complete
    /// or be interrupted by way of `Running`.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        match (self, next) {
            (Self::Init, Self::Running) | (Self::Init, Self::Failed) => true,
            (Self::Running, Self::Completed)
            | (Self::Running, Self::Interrupted)
            | (Self::Running, Self::Failed) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible run states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Init,
            Self::Running,
            Self::Completed,
            Self::Interrupted,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
