//! Derivation of a goal's progress and status from its tasks.

use serde::{Deserialize, Serialize};
use crate::goal::GoalStatus;
use crate::task::Task;

/// Progress and status computed from a goal's tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedProgress {
    /// Percentage of completed tasks (0-100)
    pub progress: u8,
    /// `completed` exactly when progress is 100, otherwise `active`
    pub status: GoalStatus,
}

/// What recalculation does to a goal the user has paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PausePolicy {
    /// Keep `paused`; only progress is rewritten.
    #[default]
    Preserve,
    /// Replace `paused` with the derived status.
    Overwrite,
}

impl std::str::FromStr for PausePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "preserve" => Ok(PausePolicy::Preserve),
            "overwrite" => Ok(PausePolicy::Overwrite),
            _ => Err(format!("unknown pause policy: {s}")),
        }
    }
}

impl DerivedProgress {
    /// Derive from completed and total task counts.
    pub fn from_counts(completed: usize, total: usize) -> Self {
        if total == 0 {
            return Self {
                progress: 0,
                status: GoalStatus::Active,
            };
        }
        let progress = round_percentage(completed.min(total), total);
        let status = if progress == 100 {
            GoalStatus::Completed
        } else {
            GoalStatus::Active
        };
        Self { progress, status }
    }

    /// Status to persist given the goal's current status.
    pub fn resolve_status(&self, current: GoalStatus, policy: PausePolicy) -> GoalStatus {
        match (current, policy) {
            (GoalStatus::Paused, PausePolicy::Preserve) => GoalStatus::Paused,
            _ => self.status,
        }
    }
}

/// Derive progress and status from the full set of a goal's tasks.
///
/// Order does not matter. An empty set yields `(0, active)`.
pub fn derive_progress<'a, I>(tasks: I) -> DerivedProgress
where
    I: IntoIterator<Item = &'a Task>,
{
    let (completed, total) = tasks
        .into_iter()
        .fold((0usize, 0usize), |(done, all), task| {
            (done + usize::from(task.completed), all + 1)
        });
    DerivedProgress::from_counts(completed, total)
}

/// `round(100 * completed / total)` with halves rounded up, in exact integer math.
///
/// `total` must be non-zero and `completed <= total`.
pub fn round_percentage(completed: usize, total: usize) -> u8 {
    debug_assert!(total > 0 && completed <= total);
    let completed = completed as u128;
    let total = total as u128;
    ((200 * completed + total) / (2 * total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::GoalId;
    use crate::task::NewTask;
    use chrono::Utc;

    fn tasks(done: usize, open: usize) -> Vec<Task> {
        let goal_id = GoalId::new();
        let now = Utc::now();
        (0..done + open)
            .map(|i| {
                let mut task = Task::create(NewTask::new(goal_id, format!("task {i}")), now).unwrap();
                if i < done {
                    task.set_completed(true, now);
                }
                task
            })
            .collect()
    }

    #[test]
    fn test_empty_set_is_zero_active() {
        let derived = derive_progress(&Vec::<Task>::new());
        assert_eq!(derived, DerivedProgress { progress: 0, status: GoalStatus::Active });
    }

    #[test]
    fn test_thirds_round_to_nearest() {
        assert_eq!(derive_progress(&tasks(1, 2)).progress, 33);
        assert_eq!(derive_progress(&tasks(2, 1)).progress, 67);
        let all = derive_progress(&tasks(3, 0));
        assert_eq!(all.progress, 100);
        assert_eq!(all.status, GoalStatus::Completed);
    }

    #[test]
    fn test_halves_round_up() {
        // 1/8 = 12.5%, 29/200 = 14.5%
        assert_eq!(round_percentage(1, 8), 13);
        assert_eq!(round_percentage(29, 200), 15);
        assert_eq!(round_percentage(1, 2), 50);
    }

    #[test]
    fn test_completed_iff_hundred_for_all_small_sets() {
        for total in 1..=60 {
            for done in 0..=total {
                let derived = DerivedProgress::from_counts(done, total);
                let exact = 100.0 * done as f64 / total as f64;
                assert!(derived.progress <= 100);
                assert!((derived.progress as f64 - exact).abs() <= 0.5);
                assert_eq!(derived.progress == 100, derived.status == GoalStatus::Completed);
            }
        }
    }

    #[test]
    fn test_status_follows_rounded_progress() {
        // 199/200 = 99.5% rounds to 100
        let derived = DerivedProgress::from_counts(199, 200);
        assert_eq!(derived.progress, 100);
        assert_eq!(derived.status, GoalStatus::Completed);

        let derived = DerivedProgress::from_counts(998, 1000);
        assert_eq!(derived.progress, 100);

        let derived = DerivedProgress::from_counts(994, 1000);
        assert_eq!(derived.progress, 99);
        assert_eq!(derived.status, GoalStatus::Active);
    }

    #[test]
    fn test_resolve_status_respects_pause_policy() {
        let derived = DerivedProgress::from_counts(2, 2);
        assert_eq!(
            derived.resolve_status(GoalStatus::Paused, PausePolicy::Preserve),
            GoalStatus::Paused
        );
        assert_eq!(
            derived.resolve_status(GoalStatus::Paused, PausePolicy::Overwrite),
            GoalStatus::Completed
        );
        assert_eq!(
            derived.resolve_status(GoalStatus::Completed, PausePolicy::Preserve),
            GoalStatus::Completed
        );
    }
}
