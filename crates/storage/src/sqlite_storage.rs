//! SQLite storage backend for goaltrack.
//!
//! Relational `goals` and `tasks` tables with a cascading foreign key. The
//! progress write-back runs inside a single transaction.

use std::path::Path;
use std::str::FromStr;
use async_trait::async_trait;
use chrono::Utc;
use goaltrack_core::{
    DerivedProgress, Goal, GoalId, GoalPatch, GoalStatus, NewGoal, NewTask, PausePolicy, Task,
    TaskId, TaskPatch, Time, UserId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::trait_::{Result, Storage, StorageError};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS goals (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        category TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active'
            CHECK (status IN ('active', 'paused', 'completed')),
        progress INTEGER NOT NULL DEFAULT 0
            CHECK (progress BETWEEN 0 AND 100),
        current_value REAL,
        target_value REAL,
        start_date TEXT,
        target_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        goal_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        completed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_goals_user ON goals(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_goal ON tasks(goal_id)",
];

const GOAL_COLUMNS: &str = "id, user_id, title, description, category, status, progress, \
     current_value, target_value, start_date, target_date, created_at, updated_at";

const TASK_COLUMNS: &str = "id, goal_id, title, completed, completed_at, created_at, updated_at";

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
            other => StorageError::Database(other.to_string()),
        }
    }
}

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Create an in-memory SQLite storage for testing.
    ///
    /// Pinned to one connection that never expires, since every new
    /// connection would see a fresh empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    // === Goal operations ===

    async fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>> {
        let rows = sqlx::query(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let goals = rows.iter().map(goal_from_row).collect::<Result<Vec<_>>>()?;
        debug!(user = %user_id, count = goals.len(), "listed goals");
        Ok(goals)
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        let mut conn = self.pool.acquire().await?;
        fetch_goal(&mut conn, id).await
    }

    async fn create_goal(&mut self, goal: NewGoal) -> Result<Goal> {
        let goal = Goal::create(goal, Utc::now())?;

        sqlx::query(&format!(
            "INSERT INTO goals ({GOAL_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(goal.id.to_string())
        .bind(goal.user_id.as_str())
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(&goal.category)
        .bind(goal.status.as_str())
        .bind(i64::from(goal.progress))
        .bind(goal.current_value)
        .bind(goal.target_value)
        .bind(goal.start_date)
        .bind(goal.target_date)
        .bind(goal.created_at)
        .bind(goal.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(goal)
    }

    async fn update_goal(&mut self, id: GoalId, patch: GoalPatch) -> Result<Goal> {
        let mut tx = self.pool.begin().await?;

        let mut goal = fetch_goal(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::goal_not_found(id))?;
        goal.apply(patch, Utc::now())?;

        sqlx::query(
            "UPDATE goals SET title = ?, description = ?, category = ?, status = ?, progress = ?,
                current_value = ?, target_value = ?, start_date = ?, target_date = ?, updated_at = ?
            WHERE id = ?",
        )
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(&goal.category)
        .bind(goal.status.as_str())
        .bind(i64::from(goal.progress))
        .bind(goal.current_value)
        .bind(goal.target_value)
        .bind(goal.start_date)
        .bind(goal.target_date)
        .bind(goal.updated_at)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(goal)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::goal_not_found(id));
        }
        Ok(())
    }

    // === Task operations ===

    async fn list_tasks(&self, goal_id: GoalId) -> Result<Vec<Task>> {
        let mut conn = self.pool.acquire().await?;
        fetch_tasks(&mut conn, goal_id).await
    }

    async fn create_task(&mut self, task: NewTask) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        if fetch_goal(&mut tx, task.goal_id).await?.is_none() {
            return Err(StorageError::goal_not_found(task.goal_id));
        }
        let task = Task::create(task, Utc::now())?;

        sqlx::query(&format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"))
            .bind(task.id.to_string())
            .bind(task.goal_id.to_string())
            .bind(&task.title)
            .bind(task.completed)
            .bind(task.completed_at)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(task)
    }

    async fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let mut task = match row {
            Some(row) => task_from_row(&row)?,
            None => return Err(StorageError::task_not_found(id)),
        };
        task.apply(patch, Utc::now())?;

        sqlx::query(
            "UPDATE tasks SET title = ?, completed = ?, completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&task.title)
        .bind(task.completed)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::task_not_found(id));
        }
        Ok(())
    }

    // === Derived progress ===

    async fn write_progress(&mut self, goal_id: GoalId, policy: PausePolicy) -> Result<Goal> {
        let mut tx = self.pool.begin().await?;

        let mut goal = fetch_goal(&mut tx, goal_id)
            .await?
            .ok_or_else(|| StorageError::goal_not_found(goal_id))?;

        let counts = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(completed), 0) AS done FROM tasks WHERE goal_id = ?",
        )
        .bind(goal_id.to_string())
        .fetch_one(&mut *tx)
        .await?;
        let total: i64 = counts.try_get("total")?;
        let done: i64 = counts.try_get("done")?;

        let derived = DerivedProgress::from_counts(done as usize, total as usize);
        let status = derived.resolve_status(goal.status, policy);
        goal.apply(GoalPatch::derived(derived.progress, status), Utc::now())?;

        sqlx::query("UPDATE goals SET progress = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(goal.progress))
            .bind(goal.status.as_str())
            .bind(goal.updated_at)
            .bind(goal_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(goal = %goal_id, total, done, progress = goal.progress, "wrote progress");
        Ok(goal)
    }
}

async fn fetch_goal(conn: &mut SqliteConnection, id: GoalId) -> Result<Option<Goal>> {
    let row = sqlx::query(&format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(goal_from_row).transpose()
}

async fn fetch_tasks(conn: &mut SqliteConnection, goal_id: GoalId) -> Result<Vec<Task>> {
    let rows = sqlx::query(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE goal_id = ? ORDER BY created_at ASC, id ASC"
    ))
    .bind(goal_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(task_from_row).collect()
}

fn goal_from_row(row: &SqliteRow) -> Result<Goal> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let progress: i64 = row.try_get("progress")?;

    Ok(Goal {
        id: id
            .parse()
            .map_err(|e| StorageError::Other(format!("bad goal id {id}: {e}")))?,
        user_id: UserId::new(row.try_get::<String, _>("user_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        status: status.parse::<GoalStatus>()?,
        progress: u8::try_from(progress)
            .map_err(|_| StorageError::Other(format!("progress out of range: {progress}")))?,
        current_value: row.try_get("current_value")?,
        target_value: row.try_get("target_value")?,
        start_date: row.try_get("start_date")?,
        target_date: row.try_get("target_date")?,
        created_at: row.try_get::<Time, _>("created_at")?,
        updated_at: row.try_get::<Time, _>("updated_at")?,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let id: String = row.try_get("id")?;
    let goal_id: String = row.try_get("goal_id")?;

    Ok(Task {
        id: id
            .parse()
            .map_err(|e| StorageError::Other(format!("bad task id {id}: {e}")))?,
        goal_id: goal_id
            .parse()
            .map_err(|e| StorageError::Other(format!("bad goal id {goal_id}: {e}")))?,
        title: row.try_get("title")?,
        completed: row.try_get("completed")?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
