//! Goaltrack CLI - goals, tasks and derived progress.

mod config;

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use goaltrack_core::{
    Goal, GoalId, GoalPatch, NewGoal, PausePolicy, Task, TaskId, UserId, SUGGESTED_CATEGORIES,
};
use goaltrack_progress::{GoalService, Operation, ServiceError};
use goaltrack_storage::{JsonStorage, SqliteStorage, Storage};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{StorageBackend, TrackerConfig};

#[derive(Parser)]
#[command(name = "goaltrack")]
#[command(about = "Track goals, break them into tasks, watch progress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage backend
    #[arg(long, value_enum, env = "GOALTRACK_BACKEND", default_value = "json")]
    backend: StorageBackend,

    /// Data directory
    #[arg(short, long, env = "GOALTRACK_STORAGE", default_value = ".goaltrack")]
    storage: std::path::PathBuf,

    /// Acting user ID
    #[arg(short, long, env = "GOALTRACK_USER", default_value = "local")]
    user: String,

    /// What task changes do to a paused goal (preserve|overwrite)
    #[arg(long, env = "GOALTRACK_PAUSE_POLICY", default_value = "preserve")]
    pause_policy: PausePolicy,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage goals
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Manage a goal's tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Show goal statistics
    Stats,
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Create a goal
    Add {
        /// Goal title
        title: String,
        /// Category; any text, see `goal categories` for suggestions
        #[arg(long, default_value = "Other")]
        category: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Numeric target
        #[arg(long)]
        target_value: Option<f64>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<NaiveDate>,
    },
    /// List goals
    List,
    /// List suggested categories
    Categories,
    /// Show a goal and its tasks
    Show {
        /// Goal ID
        id: GoalId,
    },
    /// Edit a goal's details
    Edit {
        /// Goal ID
        id: GoalId,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// New current value
        #[arg(long)]
        current_value: Option<f64>,
        /// New target value
        #[arg(long)]
        target_value: Option<f64>,
        /// New start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// New target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<NaiveDate>,
    },
    /// Put a goal on hold
    Pause {
        /// Goal ID
        id: GoalId,
    },
    /// Resume a paused goal
    Resume {
        /// Goal ID
        id: GoalId,
    },
    /// Delete a goal and its tasks
    Delete {
        /// Goal ID
        id: GoalId,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task to a goal
    Add {
        /// Goal ID
        goal: GoalId,
        /// Task title
        title: String,
    },
    /// List a goal's tasks
    List {
        /// Goal ID
        goal: GoalId,
    },
    /// Flip a task between done and not done
    Toggle {
        /// Goal ID
        goal: GoalId,
        /// Task ID
        task: TaskId,
    },
    /// Mark a task done
    Done {
        /// Goal ID
        goal: GoalId,
        /// Task ID
        task: TaskId,
    },
    /// Mark a task not done
    Undo {
        /// Goal ID
        goal: GoalId,
        /// Task ID
        task: TaskId,
    },
    /// Rename a task
    Rename {
        /// Goal ID
        goal: GoalId,
        /// Task ID
        task: TaskId,
        /// New title
        title: String,
    },
    /// Delete a task
    Delete {
        /// Goal ID
        goal: GoalId,
        /// Task ID
        task: TaskId,
    },
}

impl Cli {
    fn config(&self) -> TrackerConfig {
        TrackerConfig {
            backend: self.backend,
            storage_path: self.storage.clone(),
            user: UserId::new(self.user.clone()),
            log_filter: self.log_level.clone(),
            ..Default::default()
        }
        .with_pause_policy(self.pause_policy)
    }
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();
    init_logging(&config.log_filter);

    info!(backend = ?config.backend, path = %config.storage_path.display(), "opening storage");
    match config.backend {
        StorageBackend::Json => {
            let storage = JsonStorage::new(&config.storage_path).await?;
            run(GoalService::new(storage, config.user, config.service), cli.command).await
        }
        StorageBackend::Sqlite => {
            tokio::fs::create_dir_all(&config.storage_path).await?;
            let storage = SqliteStorage::new_from_path(&config.sqlite_path()).await?;
            if !storage.health_check().await {
                bail!("database at {} is not responding", config.sqlite_path().display());
            }
            run(GoalService::new(storage, config.user, config.service), cli.command).await
        }
    }
}

async fn run<S: Storage>(service: GoalService<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Goal(command) => run_goal(&service, command).await,
        Commands::Task(command) => run_task(&service, command).await,
        Commands::Stats => {
            let stats = notify(Operation::LoadGoals, service.stats().await)?;
            println!("Goals: {}", stats.total);
            println!("  Active: {}", stats.active);
            println!("  Paused: {}", stats.paused);
            println!("  Completed: {}", stats.completed);
            println!("  Average progress: {}%", stats.average_progress);
            println!("  Completion rate: {}%", stats.completion_rate);
            if !stats.by_category.is_empty() {
                println!("By category:");
                for (category, count) in &stats.by_category {
                    println!("  {}: {}", category, count);
                }
            }
            Ok(())
        }
    }
}

async fn run_goal<S: Storage>(service: &GoalService<S>, command: GoalCommand) -> Result<()> {
    match command {
        GoalCommand::Add { title, category, description, target_value, start_date, target_date } => {
            let new = NewGoal {
                user_id: service.user().clone(),
                title,
                description,
                category,
                current_value: None,
                target_value,
                start_date,
                target_date,
            };
            let goal = notify(Operation::CreateGoal, service.create_goal(new).await)?;
            println!("{}", format_goal(&goal));
        }
        GoalCommand::List => {
            let goals = notify(Operation::LoadGoals, service.list_goals().await)?;
            println!("Goals ({})", goals.len());
            for goal in goals {
                println!("  {}", format_goal(&goal));
            }
        }
        GoalCommand::Categories => {
            for category in SUGGESTED_CATEGORIES {
                println!("{}", category);
            }
        }
        GoalCommand::Show { id } => {
            let Some(goal) = notify(Operation::LoadGoals, service.get_goal(id).await)? else {
                println!("Goal not found");
                return Ok(());
            };
            let tasks = notify(Operation::LoadTasks, service.list_tasks(id).await)?;
            print_goal_details(&goal, &tasks);
        }
        GoalCommand::Edit {
            id,
            title,
            description,
            clear_description,
            category,
            current_value,
            target_value,
            start_date,
            target_date,
        } => {
            let patch = GoalPatch {
                title,
                description: if clear_description { Some(None) } else { description.map(Some) },
                category,
                current_value: current_value.map(Some),
                target_value: target_value.map(Some),
                start_date: start_date.map(Some),
                target_date: target_date.map(Some),
                ..Default::default()
            };
            if patch.is_empty() {
                bail!("nothing to change; pass at least one field to edit");
            }
            let goal = notify(Operation::UpdateGoal, service.update_goal(id, patch).await)?;
            println!("{}", format_goal(&goal));
        }
        GoalCommand::Pause { id } => {
            let goal = notify(Operation::UpdateGoal, service.pause_goal(id).await)?;
            println!("{}", format_goal(&goal));
        }
        GoalCommand::Resume { id } => {
            let goal = notify(Operation::UpdateGoal, service.resume_goal(id).await)?;
            println!("{}", format_goal(&goal));
        }
        GoalCommand::Delete { id } => {
            notify(Operation::DeleteGoal, service.delete_goal(id).await)?;
        }
    }
    Ok(())
}

async fn run_task<S: Storage>(service: &GoalService<S>, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Add { goal, title } => {
            let out = notify(Operation::CreateTask, service.create_task(goal, title).await)?;
            println!("{}", format_task(&out.task));
            print_progress(&out.goal);
        }
        TaskCommand::List { goal } => {
            let tasks = notify(Operation::LoadTasks, service.list_tasks(goal).await)?;
            println!("Tasks ({})", tasks.len());
            for task in tasks {
                println!("  {}", format_task(&task));
            }
        }
        TaskCommand::Toggle { goal, task } => {
            let out = notify(Operation::UpdateTask, service.toggle_task(goal, task).await)?;
            println!("{}", format_task(&out.task));
            print_progress(&out.goal);
        }
        TaskCommand::Done { goal, task } => set_completion(service, goal, task, true).await?,
        TaskCommand::Undo { goal, task } => set_completion(service, goal, task, false).await?,
        TaskCommand::Rename { goal, task, title } => {
            let task = notify(Operation::UpdateTask, service.rename_task(goal, task, title).await)?;
            println!("{}", format_task(&task));
        }
        TaskCommand::Delete { goal, task } => {
            let goal = notify(Operation::DeleteTask, service.delete_task(goal, task).await)?;
            print_progress(&goal);
        }
    }
    Ok(())
}

async fn set_completion<S: Storage>(
    service: &GoalService<S>,
    goal: GoalId,
    task: TaskId,
    completed: bool,
) -> Result<()> {
    let out = notify(
        Operation::UpdateTask,
        service.set_task_completed(goal, task, completed).await,
    )?;
    println!("{}", format_task(&out.task));
    print_progress(&out.goal);
    Ok(())
}

/// Turn a service result into the single message the user sees.
fn notify<T>(op: Operation, result: Result<T, ServiceError>) -> Result<T> {
    match result {
        Ok(value) => {
            if let Some(message) = op.success_message() {
                println!("{message}");
            }
            Ok(value)
        }
        Err(e) => {
            error!(error = %e, ?op, "operation failed");
            Err(anyhow::anyhow!(op.failure_message()))
        }
    }
}

fn format_goal(goal: &Goal) -> String {
    format!(
        "{} | {} | {:>3}% | {} | {}",
        goal.id,
        goal.status.as_str().to_uppercase(),
        goal.progress,
        goal.category,
        goal.title,
    )
}

fn format_task(task: &Task) -> String {
    format!("[{}] {} {}", if task.completed { "x" } else { " " }, task.id, task.title)
}

fn print_progress(goal: &Goal) {
    println!("Goal {}: {}% ({})", goal.id, goal.progress, goal.status);
    if goal.is_completed() {
        println!("Goal completed! Congratulations!");
    }
}

fn print_goal_details(goal: &Goal, tasks: &[Task]) {
    let done = tasks.iter().filter(|t| t.completed).count();

    println!("Goal: {}", goal.id);
    println!("  Title: {}", goal.title);
    if let Some(description) = &goal.description {
        println!("  Description: {}", description);
    }
    println!("  Category: {}", goal.category);
    println!("  Status: {}", goal.status);
    println!("  Progress: {}% ({}/{} tasks)", goal.progress, done, tasks.len());
    if let Some(target) = goal.target_value {
        println!(
            "  Value: {} / {} ({}%)",
            goal.current_value.unwrap_or(0.0),
            target,
            goal.value_progress()
        );
    }
    if let Some(days) = goal.days_until_target(Utc::now().date_naive()) {
        match days {
            d if d < 0 => println!("  Target date: overdue by {} days", -d),
            d => println!("  Target date: in {} days", d),
        }
    }
    println!("  Created: {}", goal.created_at);
    for task in tasks {
        println!("  {}", format_task(task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_task_toggle() {
        let goal = GoalId::new();
        let task = TaskId::new();
        let cli = Cli::try_parse_from([
            "goaltrack",
            "--user",
            "alice",
            "task",
            "toggle",
            &goal.to_string(),
            &task.to_string(),
        ])
        .unwrap();

        assert_eq!(cli.config().user, UserId::new("alice"));
        assert!(matches!(
            cli.command,
            Commands::Task(TaskCommand::Toggle { goal: g, task: t }) if g == goal && t == task
        ));
    }

    #[test]
    fn test_parse_pause_policy() {
        let cli = Cli::try_parse_from(["goaltrack", "--pause-policy", "overwrite", "stats"]).unwrap();
        assert_eq!(cli.config().service.pause_policy, PausePolicy::Overwrite);
    }

    #[test]
    fn test_parse_categories() {
        let cli = Cli::try_parse_from(["goaltrack", "goal", "categories"]).unwrap();
        assert!(matches!(cli.command, Commands::Goal(GoalCommand::Categories)));
    }

    #[tokio::test]
    async fn test_edit_without_fields_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let service = GoalService::new(storage, UserId::new("local"), Default::default());
        let goal = service
            .create_goal(NewGoal::new(UserId::new("local"), "Run a marathon", "Health"))
            .await
            .unwrap();

        let id = goal.id.to_string();
        let cli = Cli::try_parse_from(["goaltrack", "goal", "edit", id.as_str()]).unwrap();
        let Commands::Goal(command) = cli.command else {
            panic!("expected a goal command");
        };
        assert!(run_goal(&service, command).await.is_err());

        let stored = service.get_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, goal.updated_at);
    }

    #[test]
    fn test_rejects_bad_goal_id() {
        assert!(Cli::try_parse_from(["goaltrack", "goal", "show", "nope"]).is_err());
    }
}
