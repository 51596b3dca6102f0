//! Runtime configuration assembled from flags and environment.

use std::path::PathBuf;
use clap::ValueEnum;
use goaltrack_core::{PausePolicy, UserId};
use goaltrack_progress::ServiceConfig;

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// One JSON file per goal and task
    Json,
    /// SQLite database file
    Sqlite,
}

/// Everything the binary needs before dispatching a command.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Storage backend
    pub backend: StorageBackend,
    /// Data directory
    pub storage_path: PathBuf,
    /// Acting user
    pub user: UserId,
    /// Service settings
    pub service: ServiceConfig,
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            storage_path: ".goaltrack".into(),
            user: UserId::new("local"),
            service: ServiceConfig::default(),
            log_filter: "warn".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Path of the SQLite database inside the data directory.
    pub fn sqlite_path(&self) -> PathBuf {
        self.storage_path.join("goaltrack.db")
    }

    /// Override the pause policy.
    pub fn with_pause_policy(mut self, policy: PausePolicy) -> Self {
        self.service.pause_policy = policy;
        self
    }
}
