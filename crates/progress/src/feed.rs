//! Change notifications.
//!
//! Nothing is cached here: after each successful mutation the service
//! publishes which views are stale, and subscribers re-read from storage.

use goaltrack_core::{GoalId, UserId};
use tokio::sync::broadcast;
use tracing::trace;

/// Something a view may need to re-read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A user's goal list changed
    GoalsChanged {
        /// Owner of the list
        user_id: UserId,
    },
    /// A single goal changed
    GoalChanged(GoalId),
    /// A goal's task list changed
    TasksChanged(GoalId),
    /// Recalculation moved a goal into `completed`
    GoalCompleted(GoalId),
}

/// Broadcast channel of [`ChangeEvent`]s.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Create a feed buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        trace!(?event, "publishing change");
        let _ = self.tx.send(event);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}
