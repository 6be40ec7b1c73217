//! Error taxonomy for timer commands

use thiserror::Error;

use crate::services::time_entry::SubmitError;
use crate::state::session::TimerStatus;

/// Errors a timer command can surface to the caller.
///
/// Snapshot persistence failures are deliberately absent: the store is
/// best-effort, so reads fail closed to an empty snapshot and writes are
/// logged and dropped.
#[derive(Debug, Error)]
pub enum TimerError {
    /// The operation is not valid in the current state (e.g. `pause` while
    /// idle). The timer is left untouched.
    #[error("cannot {op} while the timer is {status}")]
    InvalidCommand {
        op: &'static str,
        status: TimerStatus,
    },

    /// `start` without a topic. Rejected before any state transition.
    #[error("a topic is required to start tracking")]
    MissingTopic,

    /// `start` of a count-down timer without a positive duration.
    #[error("count-down timers require a positive duration")]
    InvalidDuration,

    /// `start` while a session is already active and the caller did not opt
    /// into replacing it.
    #[error("a session is already {status}; pass an ifActive policy to replace it")]
    SessionActive { status: TimerStatus },

    /// The external time-entry store rejected the finalized entry. The local
    /// session has already finished and is not rolled back.
    #[error("time entry submission failed: {0}")]
    Submission(#[from] SubmitError),
}
