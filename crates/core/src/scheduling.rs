//! Generation job scheduling constants and state machine.
//!
//! Jobs move strictly forward: `queued -> processing -> completed | error`.
//! Both the ingestion path and the worker validate every write against
//! [`state_machine`] before touching the store.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Scheduler constants
// ---------------------------------------------------------------------------

/// How often the scheduler wakes up (every 5 minutes).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(300);

/// Maximum number of queued jobs claimed per tick.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Jobs stuck in `processing` longer than this are failed by the next tick.
pub const DEFAULT_STALE_AFTER_MINUTES: i64 = 60;

/// Slack on top of the worst-case generation time of one job.
pub const STALE_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Shortest stale threshold that cannot expire a job whose positions all
/// run up to the generator deadline.
pub fn min_stale_after(generator_timeout: Duration) -> Duration {
    generator_timeout * Position::ALL.len() as u32 + STALE_MARGIN
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation job, stored as a lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Stored string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use super::{CoreError, JobStatus};

    /// Returns the statuses reachable from `from`.
    pub fn valid_transitions(from: JobStatus) -> &'static [JobStatus] {
        match from {
            JobStatus::Queued => &[JobStatus::Processing],
            JobStatus::Processing => &[JobStatus::Completed, JobStatus::Error],
            JobStatus::Completed | JobStatus::Error => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning a conflict error for invalid ones.
    pub fn validate_transition(from: JobStatus, to: JobStatus) -> Result<(), CoreError> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Invalid job transition: {from} -> {to}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::state_machine::*;
    use super::JobStatus::*;

    #[test]
    fn queued_to_processing() {
        assert!(can_transition(Queued, Processing));
    }

    #[test]
    fn processing_to_completed() {
        assert!(can_transition(Processing, Completed));
    }

    #[test]
    fn processing_to_error() {
        assert!(can_transition(Processing, Error));
    }

    #[test]
    fn queued_cannot_skip_processing() {
        assert!(!can_transition(Queued, Completed));
        assert!(!can_transition(Queued, Error));
    }

    #[test]
    fn no_backwards_transitions() {
        assert!(!can_transition(Processing, Queued));
        assert!(!can_transition(Completed, Processing));
        assert!(!can_transition(Error, Queued));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(valid_transitions(Completed).is_empty());
        assert!(valid_transitions(Error).is_empty());
        assert!(Completed.is_terminal());
        assert!(Error.is_terminal());
        assert!(!Queued.is_terminal());
    }

    #[test]
    fn validate_transition_reports_names() {
        let err = validate_transition(Completed, Processing).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Conflict: Invalid job transition: completed -> processing"
        );
    }

    #[test]
    fn stale_floor_covers_every_position() {
        let floor = super::min_stale_after(std::time::Duration::from_secs(600));
        assert_eq!(floor, std::time::Duration::from_secs(4 * 600 + 300));
        assert!(floor.as_secs() <= super::DEFAULT_STALE_AFTER_MINUTES as u64 * 60);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Processing).unwrap(), "processing");
        let parsed: super::JobStatus = serde_json::from_value("error".into()).unwrap();
        assert_eq!(parsed, Error);
    }
}
