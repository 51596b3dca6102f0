//! Validation errors for core models.

/// Errors raised when a model would violate its invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Title is empty once trimmed
    #[error("title must not be empty")]
    InvalidTitle,

    /// Category is empty once trimmed
    #[error("category must not be empty")]
    InvalidCategory,

    /// Target value is negative or not a number
    #[error("target value must be a non-negative number, got {0}")]
    InvalidTargetValue(f64),

    /// Progress outside 0..=100
    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(u8),

    /// Caller tried to set a field only the recalculator may write
    #[error("{0} is derived from tasks and cannot be set directly")]
    DerivedField(&'static str),

    /// Unknown goal status label
    #[error("unknown goal status: {0}")]
    InvalidStatus(String),
}
