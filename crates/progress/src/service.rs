//! User-scoped goal and task service.

use std::sync::Arc;
use goaltrack_core::{
    CoreError, Goal, GoalId, GoalPatch, GoalStatus, NewGoal, NewTask, PausePolicy, Task, TaskId,
    TaskPatch, UserId,
};
use goaltrack_storage::Storage;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::feed::{ChangeEvent, ChangeFeed};
use crate::recalculator::ProgressRecalculator;
use crate::stats::GoalStats;

/// A task after a mutation, with its goal as recalculated.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    /// The mutated task
    pub task: Task,
    /// Parent goal with fresh progress and status
    pub goal: Goal,
}

/// Goal and task operations on behalf of one user.
///
/// Goals owned by anyone else behave as if they did not exist. Every task
/// create, toggle and delete is followed by recalculation of the parent goal
/// under the same storage lock.
pub struct GoalService<S: Storage> {
    storage: Arc<Mutex<S>>,
    user: UserId,
    recalculator: ProgressRecalculator,
    feed: ChangeFeed,
}

impl<S: Storage> Clone for GoalService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            user: self.user.clone(),
            recalculator: self.recalculator.clone(),
            feed: self.feed.clone(),
        }
    }
}

impl<S: Storage> GoalService<S> {
    /// Create a service for `user` over `storage`.
    pub fn new(storage: S, user: UserId, config: ServiceConfig) -> Self {
        let feed = ChangeFeed::new(config.feed_capacity);
        Self {
            storage: Arc::new(Mutex::new(storage)),
            user,
            recalculator: ProgressRecalculator::new(config.pause_policy, feed.clone()),
            feed,
        }
    }

    /// The same storage and feed, acting for another user.
    pub fn for_user(&self, user: UserId) -> Self {
        Self {
            user,
            ..self.clone()
        }
    }

    /// User this service acts for.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    // === Goals ===

    /// The user's goals, newest first.
    pub async fn list_goals(&self) -> Result<Vec<Goal>, ServiceError> {
        let goals = self.storage.lock().await.list_goals(&self.user).await?;
        debug!(user = %self.user, count = goals.len(), "loaded goals");
        Ok(goals)
    }

    /// A goal, or `None` when it is missing or not the user's.
    pub async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, ServiceError> {
        let goal = self.storage.lock().await.get_goal(id).await?;
        Ok(goal.filter(|g| g.user_id == self.user))
    }

    /// Create a goal owned by this service's user.
    pub async fn create_goal(&self, mut new: NewGoal) -> Result<Goal, ServiceError> {
        new.user_id = self.user.clone();
        let goal = self.storage.lock().await.create_goal(new).await?;

        info!(goal = %goal.id, title = %goal.title, "created goal");
        self.publish_goal(goal.id);
        Ok(goal)
    }

    /// Edit user-owned fields. `progress` and `status` are rejected.
    pub async fn update_goal(&self, id: GoalId, patch: GoalPatch) -> Result<Goal, ServiceError> {
        if let Some(field) = patch.derived_field() {
            return Err(CoreError::DerivedField(field).into());
        }

        let mut storage = self.storage.lock().await;
        self.owned_goal(&*storage, id).await?;
        let goal = storage.update_goal(id, patch).await?;
        drop(storage);

        info!(goal = %id, "updated goal");
        self.publish_goal(id);
        Ok(goal)
    }

    /// Delete a goal with all of its tasks.
    pub async fn delete_goal(&self, id: GoalId) -> Result<(), ServiceError> {
        let mut storage = self.storage.lock().await;
        self.owned_goal(&*storage, id).await?;
        storage.delete_goal(id).await?;
        drop(storage);

        info!(goal = %id, "deleted goal");
        self.feed.publish(ChangeEvent::TasksChanged(id));
        self.publish_goal(id);
        Ok(())
    }

    /// Put a goal on hold.
    pub async fn pause_goal(&self, id: GoalId) -> Result<Goal, ServiceError> {
        let mut storage = self.storage.lock().await;
        self.owned_goal(&*storage, id).await?;
        let goal = storage.update_goal(id, GoalPatch::status(GoalStatus::Paused)).await?;
        drop(storage);

        info!(goal = %id, "paused goal");
        self.publish_goal(id);
        Ok(goal)
    }

    /// Lift a pause; status is re-derived from the tasks.
    ///
    /// Goals that are not paused are returned unchanged.
    pub async fn resume_goal(&self, id: GoalId) -> Result<Goal, ServiceError> {
        let mut storage = self.storage.lock().await;
        let goal = self.owned_goal(&*storage, id).await?;
        if goal.status != GoalStatus::Paused {
            return Ok(goal);
        }

        let goal = self
            .recalculator
            .recalculate_with(&mut *storage, &goal, PausePolicy::Overwrite)
            .await?;
        info!(goal = %id, status = %goal.status, "resumed goal");
        Ok(goal)
    }

    /// Counts and averages over the user's goals.
    pub async fn stats(&self) -> Result<GoalStats, ServiceError> {
        Ok(GoalStats::from_goals(&self.list_goals().await?))
    }

    // === Tasks ===

    /// A goal's tasks, oldest first.
    pub async fn list_tasks(&self, goal_id: GoalId) -> Result<Vec<Task>, ServiceError> {
        let storage = self.storage.lock().await;
        self.owned_goal(&*storage, goal_id).await?;
        Ok(storage.list_tasks(goal_id).await?)
    }

    /// Add an incomplete task and recalculate the goal.
    pub async fn create_task(
        &self,
        goal_id: GoalId,
        title: impl Into<String>,
    ) -> Result<TaskOutcome, ServiceError> {
        let mut storage = self.storage.lock().await;
        let before = self.owned_goal(&*storage, goal_id).await?;

        let task = storage.create_task(NewTask::new(goal_id, title)).await?;
        info!(goal = %goal_id, task = %task.id, "created task");
        self.feed.publish(ChangeEvent::TasksChanged(goal_id));

        let goal = self.recalculator.recalculate(&mut *storage, &before).await?;
        Ok(TaskOutcome { task, goal })
    }

    /// Rename a task. Completion and progress are untouched.
    pub async fn rename_task(
        &self,
        goal_id: GoalId,
        task_id: TaskId,
        title: impl Into<String>,
    ) -> Result<Task, ServiceError> {
        let mut storage = self.storage.lock().await;
        self.owned_task(&*storage, goal_id, task_id).await?;

        let task = storage.update_task(task_id, TaskPatch::rename(title)).await?;
        drop(storage);

        info!(task = %task_id, "renamed task");
        self.feed.publish(ChangeEvent::TasksChanged(goal_id));
        Ok(task)
    }

    /// Flip a task between complete and incomplete and recalculate the goal.
    pub async fn toggle_task(
        &self,
        goal_id: GoalId,
        task_id: TaskId,
    ) -> Result<TaskOutcome, ServiceError> {
        let mut storage = self.storage.lock().await;
        let (before, task) = self.owned_task(&*storage, goal_id, task_id).await?;
        self.write_completion(&mut *storage, &before, task_id, !task.completed)
            .await
    }

    /// Set a task's completion explicitly and recalculate the goal.
    pub async fn set_task_completed(
        &self,
        goal_id: GoalId,
        task_id: TaskId,
        completed: bool,
    ) -> Result<TaskOutcome, ServiceError> {
        let mut storage = self.storage.lock().await;
        let (before, _) = self.owned_task(&*storage, goal_id, task_id).await?;
        self.write_completion(&mut *storage, &before, task_id, completed)
            .await
    }

    /// Delete a task and recalculate the goal.
    pub async fn delete_task(&self, goal_id: GoalId, task_id: TaskId) -> Result<Goal, ServiceError> {
        let mut storage = self.storage.lock().await;
        let (before, _) = self.owned_task(&*storage, goal_id, task_id).await?;

        storage.delete_task(task_id).await?;
        info!(goal = %goal_id, task = %task_id, "deleted task");
        self.feed.publish(ChangeEvent::TasksChanged(goal_id));

        self.recalculator.recalculate(&mut *storage, &before).await
    }

    // === Helpers ===

    async fn write_completion(
        &self,
        storage: &mut S,
        before: &Goal,
        task_id: TaskId,
        completed: bool,
    ) -> Result<TaskOutcome, ServiceError> {
        let task = storage
            .update_task(task_id, TaskPatch::completed(completed))
            .await?;
        info!(task = %task_id, completed, "set task completion");
        self.feed.publish(ChangeEvent::TasksChanged(before.id));

        let goal = self.recalculator.recalculate(storage, before).await?;
        Ok(TaskOutcome { task, goal })
    }

    async fn owned_goal(&self, storage: &S, id: GoalId) -> Result<Goal, ServiceError> {
        storage
            .get_goal(id)
            .await?
            .filter(|g| g.user_id == self.user)
            .ok_or_else(|| ServiceError::NotFound(format!("goal {id}")))
    }

    async fn owned_task(
        &self,
        storage: &S,
        goal_id: GoalId,
        task_id: TaskId,
    ) -> Result<(Goal, Task), ServiceError> {
        let goal = self.owned_goal(storage, goal_id).await?;
        let task = storage
            .list_tasks(goal_id)
            .await?
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ServiceError::NotFound(format!("task {task_id}")))?;
        Ok((goal, task))
    }

    fn publish_goal(&self, id: GoalId) {
        self.feed.publish(ChangeEvent::GoalChanged(id));
        self.feed.publish(ChangeEvent::GoalsChanged {
            user_id: self.user.clone(),
        });
    }
}
