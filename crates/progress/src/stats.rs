//! Aggregate statistics over a user's goals.

use std::collections::BTreeMap;
use goaltrack_core::{round_percentage, Goal, GoalStatus};
use serde::Serialize;

/// Counts and average progress across goals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoalStats {
    /// Number of goals
    pub total: usize,
    /// Goals in `active`
    pub active: usize,
    /// Goals in `paused`
    pub paused: usize,
    /// Goals in `completed`
    pub completed: usize,
    /// Mean progress, rounded half up; 0 without goals
    pub average_progress: u8,
    /// Share of goals completed, as a percentage rounded half up; 0 without goals
    pub completion_rate: u8,
    /// Goal count per category
    pub by_category: BTreeMap<String, usize>,
    /// Goal count per status
    pub by_status: BTreeMap<GoalStatus, usize>,
}

impl GoalStats {
    /// Compute statistics for `goals`.
    pub fn from_goals(goals: &[Goal]) -> Self {
        let mut stats = GoalStats {
            total: goals.len(),
            ..Default::default()
        };
        let mut progress_sum = 0usize;

        for goal in goals {
            match goal.status {
                GoalStatus::Active => stats.active += 1,
                GoalStatus::Paused => stats.paused += 1,
                GoalStatus::Completed => stats.completed += 1,
            }
            *stats.by_category.entry(goal.category.clone()).or_default() += 1;
            *stats.by_status.entry(goal.status).or_default() += 1;
            progress_sum += usize::from(goal.progress);
        }

        if !goals.is_empty() {
            let n = goals.len();
            stats.average_progress = ((2 * progress_sum + n) / (2 * n)) as u8;
            stats.completion_rate = round_percentage(stats.completed, n);
        }
        stats
    }
}
