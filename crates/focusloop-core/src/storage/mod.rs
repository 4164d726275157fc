mod config;
pub mod database;
mod memory;
pub mod migrations;

pub use config::{AppConfig, LogConfig, NotificationsConfig, TimerConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::{ConfigError, StoreError};
use crate::project::Project;
use crate::session::Session;
use crate::settings::Settings;
use crate::task::Task;

/// Persistence port used by every store in the core.
///
/// Implementations must be safe to share between the timer engine and the
/// UI layer. Each method is one logical operation on the backend; methods
/// that touch several rows are expected to apply all-or-nothing.
pub trait Store: Send + Sync {
    // ── Tasks ────────────────────────────────────────────────────────

    /// Insert a task at the front of its list.
    fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Overwrite a task's fields in place. Does not move it between lists.
    fn update_task(&self, task: &Task) -> Result<(), StoreError>;

    fn delete_task(&self, id: &str) -> Result<(), StoreError>;

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    /// Tasks of one partition, in display order.
    fn list_tasks(&self, archived: bool) -> Result<Vec<Task>, StoreError>;

    /// Move a task to the front of the active or archived list.
    fn set_task_archived(
        &self,
        id: &str,
        archived: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError>;

    /// Atomic `completed_pomodoros += 1`. `None` if the task does not exist.
    fn increment_task_completed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError>;

    /// Move every completed active task to the front of the archived list,
    /// keeping their relative order. Returns the moved tasks.
    fn archive_completed_tasks(&self, at: DateTime<Utc>) -> Result<Vec<Task>, StoreError>;

    // ── Projects ─────────────────────────────────────────────────────

    fn insert_project(&self, project: &Project) -> Result<(), StoreError>;

    fn update_project(&self, project: &Project) -> Result<(), StoreError>;

    fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError>;

    /// All projects including inactive ones, newest first.
    fn list_projects(&self) -> Result<Vec<Project>, StoreError>;

    // ── Sessions ─────────────────────────────────────────────────────

    fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    fn update_session(&self, session: &Session) -> Result<(), StoreError>;

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Full history, oldest first.
    fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;

    /// Cancel every active session. Returns the ids that were canceled.
    fn cancel_active_sessions(&self) -> Result<Vec<String>, StoreError>;

    // ── Settings ─────────────────────────────────────────────────────

    fn load_settings(&self) -> Result<Option<Settings>, StoreError>;

    fn save_settings(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// Returns the data directory.
///
/// `FOCUSLOOP_DATA_DIR` wins when set. Otherwise `~/.config/focusloop`,
/// or `~/.config/focusloop-dev` when `FOCUSLOOP_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSLOOP_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSLOOP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusloop-dev")
            } else {
                base_dir.join("focusloop")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
