//! Progress tracking services.
//!
//! Recalculation of goal progress after task mutations, the user-scoped
//! goal/task service, change notifications, and goal statistics.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod feed;
pub mod recalculator;
pub mod service;
pub mod stats;

pub use config::ServiceConfig;
pub use error::{Operation, ServiceError};
pub use feed::{ChangeEvent, ChangeFeed};
pub use recalculator::ProgressRecalculator;
pub use service::{GoalService, TaskOutcome};
pub use stats::GoalStats;
