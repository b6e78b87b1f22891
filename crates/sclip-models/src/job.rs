//! Handles for asynchronous external jobs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an external asynchronous job plus the resource it
/// will eventually produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsyncJobHandle {
    /// Job identifier assigned by the external service
    pub id: String,
    /// Locator of the target resource (URL or file path)
    pub locator: String,
}

impl AsyncJobHandle {
    pub fn new(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
        }
    }
}

impl fmt::Display for AsyncJobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.locator)
    }
}

/// Job state as reported by polling.
///
/// Transitions are driven only by polling responses:
/// `Pending -> Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

impl JobState {
    /// Check if the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Apply a polled state. Terminal states never change.
    pub fn advance(self, polled: JobState) -> JobState {
        if self.is_terminal() {
            self
        } else {
            polled
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}
