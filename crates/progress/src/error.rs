//! Service errors and the messages shown to the user.

use goaltrack_core::CoreError;
use goaltrack_storage::StorageError;

/// Errors returned by the goal service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Backend failure (I/O, database, serialization)
    #[error(transparent)]
    Storage(StorageError),

    /// Rejected by model validation
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Entity missing or owned by another user
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ServiceError::NotFound(what),
            StorageError::Invalid(e) => ServiceError::Validation(e),
            other => ServiceError::Storage(other),
        }
    }
}

/// A user-initiated operation, used to word notifications.
///
/// Every failure collapses to one generic message per operation; the cause
/// is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Listing or loading goals
    LoadGoals,
    /// Creating a goal
    CreateGoal,
    /// Editing, pausing or resuming a goal
    UpdateGoal,
    /// Deleting a goal
    DeleteGoal,
    /// Listing tasks
    LoadTasks,
    /// Creating a task
    CreateTask,
    /// Renaming or toggling a task
    UpdateTask,
    /// Deleting a task
    DeleteTask,
}

impl Operation {
    /// Message shown when the operation fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::LoadGoals => "Failed to load goals",
            Operation::CreateGoal => "Failed to create goal",
            Operation::UpdateGoal => "Failed to update goal",
            Operation::DeleteGoal => "Failed to delete goal",
            Operation::LoadTasks => "Failed to load tasks",
            Operation::CreateTask => "Failed to create task",
            Operation::UpdateTask => "Failed to update task",
            Operation::DeleteTask => "Failed to delete task",
        }
    }

    /// Message shown when the operation succeeds, if any.
    pub fn success_message(&self) -> Option<&'static str> {
        match self {
            Operation::CreateGoal => Some("Goal created successfully!"),
            Operation::UpdateGoal => Some("Goal updated successfully!"),
            Operation::DeleteGoal => Some("Goal deleted successfully!"),
            Operation::CreateTask => Some("Task created successfully!"),
            Operation::DeleteTask => Some("Task deleted successfully!"),
            _ => None,
        }
    }
}
