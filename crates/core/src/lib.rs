//! Goaltrack core data models.
//!
//! Goals, the tasks that break them down, and the rule that derives a
//! goal's progress and status from its tasks.

#![warn(missing_docs)]

// Core identities
mod id;

// Goals and tasks
mod goal;
mod task;

// Derived progress
mod progress;

mod error;

// Re-exports
pub use id::*;

pub use goal::{Goal, GoalPatch, GoalStatus, NewGoal, SUGGESTED_CATEGORIES};
pub use task::{NewTask, Task, TaskPatch, TaskState};
pub use progress::{derive_progress, round_percentage, DerivedProgress, PausePolicy};
pub use error::CoreError;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Calendar date type (goal start/target dates)
pub type Date = chrono::NaiveDate;
