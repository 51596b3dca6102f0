//! Goal model - top-level objective with derived progress.

use serde::{Deserialize, Serialize};
use crate::error::CoreError;
use crate::id::{GoalId, UserId};
use crate::{Date, Time};

/// Categories offered when creating a goal. Any non-empty label is accepted.
pub const SUGGESTED_CATEGORIES: [&str; 8] = [
    "Health & Fitness",
    "Career",
    "Education",
    "Finance",
    "Personal Development",
    "Relationships",
    "Hobbies",
    "Other",
];

/// A goal is a user objective broken down into tasks.
///
/// `progress` and `status` are derived from the goal's tasks and are only
/// written by the progress recalculator (and by [`Goal::create`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: GoalId,

    /// Owning user
    pub user_id: UserId,

    /// Goal title
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Free-form category label
    pub category: String,

    /// Lifecycle status
    pub status: GoalStatus,

    /// Percentage of completed tasks (0-100)
    pub progress: u8,

    /// Current measured value, for goals with a numeric target
    pub current_value: Option<f64>,

    /// Numeric target
    pub target_value: Option<f64>,

    /// When work on the goal starts
    pub start_date: Option<Date>,

    /// When the goal should be reached
    pub target_date: Option<Date>,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

/// Goal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    /// Goal is being worked on
    Active,
    /// Goal put on hold by the user
    Paused,
    /// Every task is done
    Completed,
}

impl GoalStatus {
    /// Storage label of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(GoalStatus::Active),
            "paused" => Ok(GoalStatus::Paused),
            "completed" => Ok(GoalStatus::Completed),
            _ => Err(CoreError::InvalidStatus(s.to_string())),
        }
    }
}

/// Fields supplied when creating a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    /// Owning user
    pub user_id: UserId,
    /// Goal title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Category label
    pub category: String,
    /// Starting value; defaults to 0
    #[serde(default)]
    pub current_value: Option<f64>,
    /// Numeric target
    #[serde(default)]
    pub target_value: Option<f64>,
    /// Start date
    #[serde(default)]
    pub start_date: Option<Date>,
    /// Target date
    #[serde(default)]
    pub target_date: Option<Date>,
}

impl NewGoal {
    /// Minimal creation fields.
    pub fn new(user_id: UserId, title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            description: None,
            category: category.into(),
            current_value: None,
            target_value: None,
            start_date: None,
            target_date: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the numeric target.
    pub fn with_target_value(mut self, target: f64) -> Self {
        self.target_value = Some(target);
        self
    }

    /// Set the target date.
    pub fn with_target_date(mut self, date: Date) -> Self {
        self.target_date = Some(date);
        self
    }
}

/// Partial update of a goal.
///
/// `None` leaves a field untouched. Nullable columns take `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<Option<String>>,
    /// New category
    pub category: Option<String>,
    /// New current value
    pub current_value: Option<Option<f64>>,
    /// New target value
    pub target_value: Option<Option<f64>>,
    /// New start date
    pub start_date: Option<Option<Date>>,
    /// New target date
    pub target_date: Option<Option<Date>>,
    /// Derived: status
    pub status: Option<GoalStatus>,
    /// Derived: progress
    pub progress: Option<u8>,
}

impl GoalPatch {
    /// Patch carrying only the derived pair.
    pub fn derived(progress: u8, status: GoalStatus) -> Self {
        Self {
            progress: Some(progress),
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch that only changes the status.
    pub fn status(status: GoalStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Name of the first derived field this patch sets, if any.
    pub fn derived_field(&self) -> Option<&'static str> {
        if self.progress.is_some() {
            Some("progress")
        } else if self.status.is_some() {
            Some("status")
        } else {
            None
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Goal {
    /// Build a fresh goal: `progress = 0`, `status = active`.
    pub fn create(new: NewGoal, now: Time) -> Result<Self, CoreError> {
        let title = validate_title(&new.title)?;
        let category = validate_category(&new.category)?;
        if let Some(target) = new.target_value {
            validate_target(target)?;
        }

        Ok(Self {
            id: GoalId::new(),
            user_id: new.user_id,
            title,
            description: new.description.filter(|d| !d.trim().is_empty()),
            category,
            status: GoalStatus::Active,
            progress: 0,
            current_value: Some(new.current_value.unwrap_or(0.0)),
            target_value: new.target_value,
            start_date: new.start_date,
            target_date: new.target_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update, validating every touched field first.
    pub fn apply(&mut self, patch: GoalPatch, now: Time) -> Result<(), CoreError> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let category = patch.category.as_deref().map(validate_category).transpose()?;
        if let Some(Some(target)) = patch.target_value {
            validate_target(target)?;
        }
        if let Some(progress) = patch.progress {
            if progress > 100 {
                return Err(CoreError::InvalidProgress(progress));
            }
        }

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(current) = patch.current_value {
            self.current_value = current;
        }
        if let Some(target) = patch.target_value {
            self.target_value = target;
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(target_date) = patch.target_date {
            self.target_date = target_date;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Progress towards the numeric target, capped at 100.
    ///
    /// Independent of task progress; 0 when there is no usable target.
    pub fn value_progress(&self) -> u8 {
        let (Some(current), Some(target)) = (self.current_value, self.target_value) else {
            return 0;
        };
        if target == 0.0 || !target.is_finite() || !current.is_finite() {
            return 0;
        }
        ((current / target) * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Days from `today` until the target date (negative once overdue).
    pub fn days_until_target(&self, today: Date) -> Option<i64> {
        self.target_date.map(|target| (target - today).num_days())
    }

    /// Whether the goal is at its final status.
    pub fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }
}

pub(crate) fn validate_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn validate_category(category: &str) -> Result<String, CoreError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidCategory);
    }
    Ok(trimmed.to_string())
}

fn validate_target(target: f64) -> Result<(), CoreError> {
    if !target.is_finite() || target < 0.0 {
        return Err(CoreError::InvalidTargetValue(target));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn new_goal() -> NewGoal {
        NewGoal::new(UserId::new("user-1"), "Run a marathon", "Health & Fitness")
    }

    #[test]
    fn test_create_starts_active_at_zero() {
        let goal = Goal::create(new_goal(), Utc::now()).unwrap();
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress, 0);
        assert_eq!(goal.current_value, Some(0.0));
        assert_eq!(goal.created_at, goal.updated_at);
    }

    #[test]
    fn test_create_trims_and_rejects_blank_title() {
        let mut new = new_goal();
        new.title = "  Learn Rust  ".to_string();
        assert_eq!(Goal::create(new, Utc::now()).unwrap().title, "Learn Rust");

        let mut blank = new_goal();
        blank.title = "   ".to_string();
        assert_eq!(Goal::create(blank, Utc::now()), Err(CoreError::InvalidTitle));
    }

    #[test]
    fn test_create_rejects_negative_target() {
        let new = new_goal().with_target_value(-5.0);
        assert!(matches!(
            Goal::create(new, Utc::now()),
            Err(CoreError::InvalidTargetValue(_))
        ));
    }

    #[test]
    fn test_apply_clears_nullable_fields() {
        let mut goal = Goal::create(new_goal().with_description("42km"), Utc::now()).unwrap();
        let patch = GoalPatch {
            description: Some(None),
            title: Some("Run a half marathon".to_string()),
            ..Default::default()
        };
        goal.apply(patch, Utc::now()).unwrap();
        assert_eq!(goal.description, None);
        assert_eq!(goal.title, "Run a half marathon");
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut goal = Goal::create(new_goal(), Utc::now()).unwrap();
        let before = goal.clone();
        let patch = GoalPatch {
            title: Some("New title".to_string()),
            category: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(goal.apply(patch, Utc::now()), Err(CoreError::InvalidCategory));
        assert_eq!(goal, before);
    }

    #[test]
    fn test_apply_rejects_progress_over_hundred() {
        let mut goal = Goal::create(new_goal(), Utc::now()).unwrap();
        let patch = GoalPatch::derived(101, GoalStatus::Active);
        assert_eq!(goal.apply(patch, Utc::now()), Err(CoreError::InvalidProgress(101)));
    }

    #[test]
    fn test_derived_field_detection() {
        assert_eq!(GoalPatch::derived(10, GoalStatus::Active).derived_field(), Some("progress"));
        assert_eq!(GoalPatch::status(GoalStatus::Paused).derived_field(), Some("status"));
        assert!(GoalPatch::default().is_empty());
    }

    #[test]
    fn test_value_progress_caps_and_handles_zero_target() {
        let mut goal = Goal::create(new_goal().with_target_value(200.0), Utc::now()).unwrap();
        goal.current_value = Some(50.0);
        assert_eq!(goal.value_progress(), 25);

        goal.current_value = Some(500.0);
        assert_eq!(goal.value_progress(), 100);

        goal.target_value = Some(0.0);
        assert_eq!(goal.value_progress(), 0);
    }

    #[test]
    fn test_days_until_target() {
        let target = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let goal = Goal::create(new_goal().with_target_date(target), Utc::now()).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        assert_eq!(goal.days_until_target(today), Some(30));

        let late = NaiveDate::from_ymd_opt(2027, 1, 2).unwrap();
        assert_eq!(goal.days_until_target(late), Some(-2));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(serde_json::to_string(&GoalStatus::Paused).unwrap(), "\"paused\"");
        assert_eq!("Completed".parse::<GoalStatus>().unwrap(), GoalStatus::Completed);
        assert!("archived".parse::<GoalStatus>().is_err());
    }
}
