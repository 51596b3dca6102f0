//! Task model - a checklist item contributing to its goal's progress.

use serde::{Deserialize, Serialize};
use crate::error::CoreError;
use crate::goal::validate_title;
use crate::id::{GoalId, TaskId};
use crate::Time;

/// A task belongs to exactly one goal and is deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Parent goal
    pub goal_id: GoalId,

    /// Task title
    pub title: String,

    /// Whether the task is done
    pub completed: bool,

    /// Set on the transition to completed, cleared when reopened
    pub completed_at: Option<Time>,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,
}

/// The two states of a task. There is no partial completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Not done yet
    Incomplete,
    /// Done
    Complete,
}

impl TaskState {
    /// The state reached by a toggle.
    pub fn toggled(self) -> Self {
        match self {
            TaskState::Incomplete => TaskState::Complete,
            TaskState::Complete => TaskState::Incomplete,
        }
    }
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    /// Parent goal
    pub goal_id: GoalId,
    /// Task title
    pub title: String,
}

impl NewTask {
    /// Creation fields for a task under `goal_id`.
    pub fn new(goal_id: GoalId, title: impl Into<String>) -> Self {
        Self {
            goal_id,
            title: title.into(),
        }
    }
}

/// Partial update of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New completion flag
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Patch that only sets the completion flag.
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// Patch that only renames the task.
    pub fn rename(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

impl Task {
    /// Build a fresh, incomplete task.
    pub fn create(new: NewTask, now: Time) -> Result<Self, CoreError> {
        Ok(Self {
            id: TaskId::new(),
            goal_id: new.goal_id,
            title: validate_title(&new.title)?,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        if self.completed {
            TaskState::Complete
        } else {
            TaskState::Incomplete
        }
    }

    /// Flip the state, stamping or clearing `completed_at`.
    pub fn toggle(&mut self, now: Time) -> TaskState {
        let next = self.state().toggled();
        self.set_completed(next == TaskState::Complete, now);
        next
    }

    /// Move to the given state. Returns `false` if already there.
    pub fn set_completed(&mut self, completed: bool, now: Time) -> bool {
        if self.completed == completed {
            return false;
        }
        self.completed = completed;
        self.completed_at = completed.then_some(now);
        self.updated_at = now;
        true
    }

    /// Apply a partial update. Returns whether the completion flag changed.
    pub fn apply(&mut self, patch: TaskPatch, now: Time) -> Result<bool, CoreError> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        if let Some(title) = title {
            self.title = title;
            self.updated_at = now;
        }
        Ok(match patch.completed {
            Some(completed) => self.set_completed(completed, now),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn task() -> Task {
        Task::create(NewTask::new(GoalId::new(), "Buy running shoes"), Utc::now()).unwrap()
    }

    #[test]
    fn test_create_is_incomplete() {
        let task = task();
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.state(), TaskState::Incomplete);
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let new = NewTask::new(GoalId::new(), "\t ");
        assert_eq!(Task::create(new, Utc::now()), Err(CoreError::InvalidTitle));
    }

    #[test]
    fn test_toggle_stamps_and_clears_completed_at() {
        let mut task = task();
        let done_at = Utc::now() + Duration::minutes(5);

        assert_eq!(task.toggle(done_at), TaskState::Complete);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(done_at));
        assert_eq!(task.updated_at, done_at);

        let reopened_at = done_at + Duration::minutes(1);
        assert_eq!(task.toggle(reopened_at), TaskState::Incomplete);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.updated_at, reopened_at);
    }

    #[test]
    fn test_set_completed_to_same_state_is_noop() {
        let mut task = task();
        let before = task.clone();
        assert!(!task.set_completed(false, Utc::now() + Duration::hours(1)));
        assert_eq!(task, before);
    }

    #[test]
    fn test_apply_reports_completion_change() {
        let mut task = task();
        assert!(!task.apply(TaskPatch::rename("Buy trail shoes"), Utc::now()).unwrap());
        assert_eq!(task.title, "Buy trail shoes");
        assert!(task.apply(TaskPatch::completed(true), Utc::now()).unwrap());
        assert!(task.completed_at.is_some());
    }
}
