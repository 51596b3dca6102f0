//! Service configuration.

use goaltrack_core::PausePolicy;

/// Configuration for [`GoalService`](crate::GoalService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// How recalculation treats paused goals
    pub pause_policy: PausePolicy,
    /// Buffered change events per subscriber before the oldest are dropped
    pub feed_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pause_policy: PausePolicy::Preserve,
            feed_capacity: 64,
        }
    }
}
