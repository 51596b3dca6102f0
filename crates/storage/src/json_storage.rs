//! JSON file storage implementation.
//!
//! Stores one pretty-printed JSON file per goal and per task under a root
//! directory (`goals/` and `tasks/`).

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::Utc;
use goaltrack_core::{Goal, GoalId, GoalPatch, NewGoal, NewTask, Task, TaskId, TaskPatch, UserId};
use tokio::fs;
use tracing::{debug, warn};

use super::{Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage, making the `goals/` and `tasks/` directories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("goals")).await?;
        fs::create_dir_all(root.join("tasks")).await?;

        Ok(Self { root })
    }

    fn goal_path(&self, id: GoalId) -> PathBuf {
        self.root.join("goals").join(format!("{}.json", id))
    }

    fn task_path(&self, id: TaskId) -> PathBuf {
        self.root.join("tasks").join(format!("{}.json", id))
    }

    async fn write_goal(&self, goal: &Goal) -> Result<()> {
        write_json(&self.goal_path(goal.id), goal).await
    }

    async fn write_task(&self, task: &Task) -> Result<()> {
        write_json(&self.task_path(task.id), task).await
    }

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>> {
        read_json(&self.task_path(id)).await
    }
}

#[async_trait]
impl Storage for JsonStorage {
    // === Goal operations ===

    async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = list_dir(&self.root.join("goals")).await?;
        goals.retain(|g| &g.user_id == user_id);
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        debug!(user = %user_id, count = goals.len(), "listed goals");
        Ok(goals)
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        read_json(&self.goal_path(id)).await
    }

    async fn create_goal(&mut self, goal: NewGoal) -> Result<Goal> {
        let goal = Goal::create(goal, Utc::now())?;
        self.write_goal(&goal).await?;
        Ok(goal)
    }

    async fn update_goal(&mut self, id: GoalId, patch: GoalPatch) -> Result<Goal> {
        let mut goal = self
            .get_goal(id)
            .await?
            .ok_or_else(|| StorageError::goal_not_found(id))?;
        goal.apply(patch, Utc::now())?;
        self.write_goal(&goal).await?;
        Ok(goal)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        let path = self.goal_path(id);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::goal_not_found(id));
        }

        for task in self.list_tasks(id).await? {
            remove_file(&self.task_path(task.id)).await?;
        }
        remove_file(&path).await?;
        Ok(())
    }

    // === Task operations ===

    async fn list_tasks(&self, goal_id: GoalId) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = list_dir(&self.root.join("tasks")).await?;
        tasks.retain(|t| t.goal_id == goal_id);
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn create_task(&mut self, task: NewTask) -> Result<Task> {
        if self.get_goal(task.goal_id).await?.is_none() {
            return Err(StorageError::goal_not_found(task.goal_id));
        }
        let task = Task::create(task, Utc::now())?;
        self.write_task(&task).await?;
        Ok(task)
    }

    async fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let mut task = self
            .load_task(id)
            .await?
            .ok_or_else(|| StorageError::task_not_found(id))?;
        task.apply(patch, Utc::now())?;
        self.write_task(&task).await?;
        Ok(task)
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<()> {
        let path = self.task_path(id);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::task_not_found(id));
        }
        remove_file(&path).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `value` next to `path` and rename it into place, so readers never
/// see a partially written record.
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Load every `.json` record in `dir`. An unreadable record fails the whole
/// listing; callers derive progress from it and must not see a partial set.
async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable record");
                return Err(e);
            }
        }
    }
    Ok(items)
}

async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goaltrack_core::{GoalStatus, PausePolicy};

    async fn storage() -> (tempfile::TempDir, JsonStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    fn new_goal(user: &str, title: &str) -> NewGoal {
        NewGoal::new(UserId::new(user), title, "Career")
    }

    #[tokio::test]
    async fn test_goal_roundtrip_and_user_scoping() {
        let (_dir, mut storage) = storage().await;

        let mine = storage.create_goal(new_goal("alice", "Ship v1")).await.unwrap();
        storage.create_goal(new_goal("bob", "Learn piano")).await.unwrap();

        let loaded = storage.get_goal(mine.id).await.unwrap().unwrap();
        assert_eq!(loaded, mine);

        let goals = storage.list_goals(&UserId::new("alice")).await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].title, "Ship v1");
    }

    #[tokio::test]
    async fn test_list_goals_newest_first() {
        let (_dir, mut storage) = storage().await;

        let first = storage.create_goal(new_goal("alice", "First")).await.unwrap();
        let second = storage.create_goal(new_goal("alice", "Second")).await.unwrap();

        let goals = storage.list_goals(&UserId::new("alice")).await.unwrap();
        let ids: Vec<_> = goals.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_missing_goal_is_none() {
        let (_dir, storage) = storage().await;
        assert!(storage.get_goal(GoalId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_task_requires_goal() {
        let (_dir, mut storage) = storage().await;
        let err = storage
            .create_task(NewTask::new(GoalId::new(), "orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_task_stamps_completed_at() {
        let (_dir, mut storage) = storage().await;
        let goal = storage.create_goal(new_goal("alice", "Ship v1")).await.unwrap();
        let task = storage.create_task(NewTask::new(goal.id, "Write docs")).await.unwrap();

        let done = storage.update_task(task.id, TaskPatch::completed(true)).await.unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let reopened = storage.update_task(task.id, TaskPatch::completed(false)).await.unwrap();
        assert!(reopened.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_goal_cascades_tasks() {
        let (_dir, mut storage) = storage().await;
        let goal = storage.create_goal(new_goal("alice", "Ship v1")).await.unwrap();
        let other = storage.create_goal(new_goal("alice", "Hire")).await.unwrap();
        storage.create_task(NewTask::new(goal.id, "a")).await.unwrap();
        storage.create_task(NewTask::new(goal.id, "b")).await.unwrap();
        storage.create_task(NewTask::new(other.id, "c")).await.unwrap();

        storage.delete_goal(goal.id).await.unwrap();

        assert!(storage.get_goal(goal.id).await.unwrap().is_none());
        assert!(storage.list_tasks(goal.id).await.unwrap().is_empty());
        assert_eq!(storage.list_tasks(other.id).await.unwrap().len(), 1);
        assert!(matches!(
            storage.delete_goal(goal.id).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_write_progress_rederives_from_tasks() {
        let (_dir, mut storage) = storage().await;
        let goal = storage.create_goal(new_goal("alice", "Ship v1")).await.unwrap();
        let a = storage.create_task(NewTask::new(goal.id, "a")).await.unwrap();
        storage.create_task(NewTask::new(goal.id, "b")).await.unwrap();
        storage.update_task(a.id, TaskPatch::completed(true)).await.unwrap();

        // Drift the stored value; recalculation must heal it.
        storage.update_goal(goal.id, GoalPatch::derived(90, GoalStatus::Active)).await.unwrap();

        let goal = storage.write_progress(goal.id, PausePolicy::Preserve).await.unwrap();
        assert_eq!(goal.progress, 50);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    #[tokio::test]
    async fn test_corrupt_task_fails_listing_and_recalculation() {
        let (dir, mut storage) = storage().await;
        let goal = storage.create_goal(new_goal("alice", "Ship v1")).await.unwrap();
        let a = storage.create_task(NewTask::new(goal.id, "a")).await.unwrap();
        let b = storage.create_task(NewTask::new(goal.id, "b")).await.unwrap();
        storage.update_task(a.id, TaskPatch::completed(true)).await.unwrap();

        let torn = dir.path().join("tasks").join(format!("{}.json", b.id));
        std::fs::write(&torn, "{\"id\":").unwrap();

        assert!(matches!(storage.list_tasks(goal.id).await, Err(StorageError::Json(_))));
        assert!(storage.write_progress(goal.id, PausePolicy::Preserve).await.is_err());

        let stored = storage.get_goal(goal.id).await.unwrap().unwrap();
        assert_eq!((stored.progress, stored.status), (0, GoalStatus::Active));
    }

    #[tokio::test]
    async fn test_writes_leave_no_temp_files() {
        let (dir, mut storage) = storage().await;
        let goal = storage.create_goal(new_goal("alice", "Ship v1")).await.unwrap();
        let task = storage.create_task(NewTask::new(goal.id, "a")).await.unwrap();
        storage.update_task(task.id, TaskPatch::completed(true)).await.unwrap();

        for kind in ["goals", "tasks"] {
            let names: Vec<_> = std::fs::read_dir(dir.path().join(kind))
                .unwrap()
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect();
            assert_eq!(names.len(), 1);
            assert!(names[0].ends_with(".json"));
        }
    }

    #[tokio::test]
    async fn test_write_progress_on_missing_goal() {
        let (_dir, mut storage) = storage().await;
        for policy in [PausePolicy::Preserve, PausePolicy::Overwrite] {
            let err = storage.write_progress(GoalId::new(), policy).await.unwrap_err();
            assert!(matches!(err, StorageError::NotFound(_)));
        }
    }
}
