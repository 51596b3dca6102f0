//! Progress recalculation after task mutations.

use goaltrack_core::{Goal, PausePolicy};
use goaltrack_storage::Storage;
use tracing::info;

use crate::error::ServiceError;
use crate::feed::{ChangeEvent, ChangeFeed};

/// Re-derives a goal's `progress` and `status` from its tasks.
///
/// This is the only writer of those two fields after goal creation. The
/// value is recomputed from scratch each time, so any earlier drift heals.
#[derive(Debug, Clone)]
pub struct ProgressRecalculator {
    policy: PausePolicy,
    feed: ChangeFeed,
}

impl ProgressRecalculator {
    /// Create a recalculator publishing to `feed`.
    pub fn new(policy: PausePolicy, feed: ChangeFeed) -> Self {
        Self { policy, feed }
    }

    /// Recalculate `before` using the configured policy.
    pub async fn recalculate<S>(&self, storage: &mut S, before: &Goal) -> Result<Goal, ServiceError>
    where
        S: Storage + ?Sized,
    {
        self.recalculate_with(storage, before, self.policy).await
    }

    /// Recalculate `before` with an explicit policy.
    ///
    /// `before` is the goal as last read; it decides whether the write
    /// counts as a completion.
    pub async fn recalculate_with<S>(
        &self,
        storage: &mut S,
        before: &Goal,
        policy: PausePolicy,
    ) -> Result<Goal, ServiceError>
    where
        S: Storage + ?Sized,
    {
        let after = storage.write_progress(before.id, policy).await?;

        info!(
            goal = %after.id,
            progress = after.progress,
            status = %after.status,
            "recalculated goal progress"
        );

        self.feed.publish(ChangeEvent::GoalChanged(after.id));
        self.feed.publish(ChangeEvent::GoalsChanged {
            user_id: after.user_id.clone(),
        });
        if after.is_completed() && !before.is_completed() {
            info!(goal = %after.id, "goal completed");
            self.feed.publish(ChangeEvent::GoalCompleted(after.id));
        }

        Ok(after)
    }
}
