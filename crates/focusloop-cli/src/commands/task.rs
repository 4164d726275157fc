//! Task management commands for CLI.

use clap::Subcommand;
use focusloop_core::{TaskPatch, TaskStore};
use serde_json::json;

use super::{open_store, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task at the top of the active list
    Create {
        /// Task title
        title: String,
        /// Estimated pomodoros (1-10)
        #[arg(long, default_value_t = 1)]
        estimate: u32,
        /// Project ID to associate with
        #[arg(long)]
        project_id: Option<String>,
        /// Task description
        #[arg(long)]
        description: Option<String>,
    },
    /// List active tasks, or archived ones with --archived
    List {
        #[arg(long)]
        archived: bool,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description (empty clears it)
        #[arg(long)]
        description: Option<String>,
        /// New project ID (empty clears it)
        #[arg(long)]
        project_id: Option<String>,
        /// New estimate (1-10)
        #[arg(long)]
        estimate: Option<u32>,
        /// Overwrite the completed pomodoro counter
        #[arg(long)]
        completed_pomodoros: Option<u32>,
    },
    /// Toggle the completed flag
    Done {
        /// Task ID
        id: String,
    },
    /// Move a task to the archive
    Archive {
        /// Task ID
        id: String,
    },
    /// Move a task back to the active list
    Unarchive {
        /// Task ID
        id: String,
    },
    /// Delete a task permanently
    Delete {
        /// Task ID
        id: String,
    },
    /// Archive every completed active task
    ArchiveCompleted,
}

/// Empty string means "clear the field".
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}

pub fn run(action: TaskAction) -> CmdResult {
    let tasks = TaskStore::new(open_store()?);
    tasks.load()?;

    match action {
        TaskAction::Create {
            title,
            estimate,
            project_id,
            description,
        } => {
            let task = tasks.create(&title, estimate, project_id, description)?;
            print_json(&task)?;
        }
        TaskAction::List { archived } => {
            let list = if archived {
                tasks.archived()
            } else {
                tasks.active()
            };
            print_json(&list)?;
        }
        TaskAction::Update {
            id,
            title,
            description,
            project_id,
            estimate,
            completed_pomodoros,
        } => {
            let patch = TaskPatch {
                title,
                description: clearable(description),
                project_id: clearable(project_id),
                estimated_pomodoros: estimate,
                completed_pomodoros,
                completed: None,
            };
            let task = tasks.update(&id, &patch)?;
            print_json(&task)?;
        }
        TaskAction::Done { id } => {
            print_json(&tasks.toggle_completion(&id)?)?;
        }
        TaskAction::Archive { id } => {
            print_json(&tasks.archive(&id)?)?;
        }
        TaskAction::Unarchive { id } => {
            print_json(&tasks.unarchive(&id)?)?;
        }
        TaskAction::Delete { id } => {
            tasks.delete(&id)?;
            print_json(&json!({ "deleted": id }))?;
        }
        TaskAction::ArchiveCompleted => {
            print_json(&tasks.archive_all_completed()?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_clears() {
        assert_eq!(clearable(None), None);
        assert_eq!(clearable(Some(" ".into())), Some(None));
        assert_eq!(clearable(Some("x".into())), Some(Some("x".into())));
    }
}
