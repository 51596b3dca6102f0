//! Storage trait abstraction.

use async_trait::async_trait;
use goaltrack_core::{
    derive_progress, CoreError, Goal, GoalId, GoalPatch, NewGoal, NewTask, PausePolicy, Task,
    TaskId, TaskPatch, UserId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected by model validation
    #[error("invalid data: {0}")]
    Invalid(#[from] CoreError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl StorageError {
    pub(crate) fn goal_not_found(id: GoalId) -> Self {
        StorageError::NotFound(format!("goal {id}"))
    }

    pub(crate) fn task_not_found(id: TaskId) -> Self {
        StorageError::NotFound(format!("task {id}"))
    }
}

/// Persistence surface for goals and their tasks.
///
/// This trait allows different storage backends to be plugged in.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Goal operations ===

    /// List a user's goals, newest first.
    async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>>;

    /// Load a goal by ID.
    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>>;

    /// Create a goal with `progress = 0` and `status = active`.
    async fn create_goal(&mut self, goal: NewGoal) -> Result<Goal>;

    /// Apply a partial update to a goal.
    async fn update_goal(&mut self, id: GoalId, patch: GoalPatch) -> Result<Goal>;

    /// Delete a goal and every task belonging to it.
    async fn delete_goal(&mut self, id: GoalId) -> Result<()>;

    // === Task operations ===

    /// List a goal's tasks, oldest first.
    async fn list_tasks(&self, goal_id: GoalId) -> Result<Vec<Task>>;

    /// Create an incomplete task under an existing goal.
    async fn create_task(&mut self, task: NewTask) -> Result<Task>;

    /// Apply a partial update to a task.
    async fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task>;

    /// Delete a task.
    async fn delete_task(&mut self, id: TaskId) -> Result<()>;

    // === Derived progress ===

    /// Recompute a goal's progress and status from its tasks and persist them.
    ///
    /// The default reads the tasks and writes the goal as two separate calls.
    /// Backends with transactions override this to make the pair atomic.
    async fn write_progress(&mut self, goal_id: GoalId, policy: PausePolicy) -> Result<Goal> {
        let current_status = match policy {
            PausePolicy::Overwrite => None,
            PausePolicy::Preserve => Some(
                self.get_goal(goal_id)
                    .await?
                    .ok_or_else(|| StorageError::goal_not_found(goal_id))?
                    .status,
            ),
        };

        let tasks = self.list_tasks(goal_id).await?;
        let derived = derive_progress(&tasks);
        let status = current_status
            .map(|current| derived.resolve_status(current, policy))
            .unwrap_or(derived.status);

        self.update_goal(goal_id, GoalPatch::derived(derived.progress, status)).await
    }
}
