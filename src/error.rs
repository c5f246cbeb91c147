//! Error Types
//!
//! `ApiError` describes what went wrong talking to the server.
//! `SyncError` is what the protocols report to the UI. None of these are
//! fatal: each resolves to an unchanged or reverted local state plus a message.

use thiserror::Error;

use crate::models::{ColumnId, Container, SprintId, SprintStatus, TaskId};
use crate::sprint::SprintAction;

/// Failures of the remote collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Transport failure (no response)
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with an error status
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Body could not be decoded
    #[error("could not decode response: {0}")]
    Decode(String),

    /// Payload was missing a field the model requires
    #[error("{entity} payload is missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => ApiError::Decode(err.to_string()),
            None => ApiError::Network(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Outcomes of sync operations that did not take effect
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Column WIP limit would be exceeded; nothing was sent
    #[error("column {column_id} is at its limit ({occupancy}/{limit})")]
    AdmissionRejected {
        column_id: ColumnId,
        limit: u32,
        occupancy: usize,
    },

    /// Remote call failed after an optimistic mutation, which was rolled back
    #[error("change was not saved: {source}")]
    PersistenceFailed {
        task_id: Option<TaskId>,
        #[source]
        source: ApiError,
    },

    /// Remote call failed before anything changed locally
    #[error("request failed: {0}")]
    Remote(#[from] ApiError),

    /// Lifecycle action not permitted from the current status
    #[error("sprint {sprint_id} cannot {action} while {from}")]
    InvalidTransition {
        sprint_id: SprintId,
        from: SprintStatus,
        action: SprintAction,
    },

    /// Membership of a completed sprint is frozen
    #[error("sprint {sprint_id} is completed; its tasks cannot change")]
    SprintClosed { sprint_id: SprintId },

    /// Another move of the same task has not resolved yet
    #[error("task {task_id} is already being moved")]
    MoveInFlight { task_id: TaskId },

    #[error("a drag is already in progress")]
    DragInProgress,

    #[error("no drag in progress")]
    NotDragging,

    #[error("task {task_id} is not in {container}")]
    NotInContainer { task_id: TaskId, container: Container },

    /// Board columns and sprint lists are separate views
    #[error("cannot move a task from {from} to {to}")]
    IncompatibleContainers { from: Container, to: Container },

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("unknown column {0}")]
    UnknownColumn(ColumnId),

    #[error("unknown sprint {0}")]
    UnknownSprint(SprintId),

    /// The move was cancelled before its remote call resolved; no effects applied
    #[error("move of task {task_id} was cancelled")]
    Superseded { task_id: TaskId },
}

impl SyncError {
    /// Whether the UI should show this to the user
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, SyncError::Superseded { .. })
    }

    /// Whether local state was reverted because of this error
    pub fn rolled_back(&self) -> bool {
        matches!(self, SyncError::PersistenceFailed { .. })
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_message() {
        let err = SyncError::AdmissionRejected {
            column_id: 1,
            limit: 2,
            occupancy: 2,
        };
        assert_eq!(err.to_string(), "column 1 is at its limit (2/2)");
        assert!(err.is_user_visible());
        assert!(!err.rolled_back());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = SyncError::InvalidTransition {
            sprint_id: 4,
            from: SprintStatus::Active,
            action: SprintAction::Start,
        };
        assert_eq!(err.to_string(), "sprint 4 cannot start while ACTIVE");
    }

    #[test]
    fn test_superseded_is_silent() {
        let err = SyncError::Superseded { task_id: 1 };
        assert!(!err.is_user_visible());
    }

    #[test]
    fn test_persistence_failure_keeps_source() {
        let err = SyncError::PersistenceFailed {
            task_id: Some(3),
            source: ApiError::Network("offline".to_string()),
        };
        assert!(err.rolled_back());
        assert_eq!(err.to_string(), "change was not saved: network error: offline");
    }
}
