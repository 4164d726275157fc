//! Project management commands for CLI.

use clap::Subcommand;
use focusloop_core::{ProjectPatch, ProjectStore};
use serde_json::json;

use super::{open_store, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        /// Project title
        title: String,
        /// Display color, e.g. "#ff8800"
        #[arg(long)]
        color: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List active projects
    List,
    /// Update a project
    Update {
        /// Project ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// New description (empty clears it)
        #[arg(long)]
        description: Option<String>,
    },
    /// Deactivate a project. Its tasks are kept.
    Delete {
        /// Project ID
        id: String,
    },
}

pub fn run(action: ProjectAction) -> CmdResult {
    let projects = ProjectStore::new(open_store()?);
    projects.load()?;

    match action {
        ProjectAction::Create {
            title,
            color,
            description,
        } => {
            print_json(&projects.create(&title, &color, description)?)?;
        }
        ProjectAction::List => {
            print_json(&projects.projects())?;
        }
        ProjectAction::Update {
            id,
            title,
            color,
            description,
        } => {
            let patch = ProjectPatch {
                title,
                color,
                description: description.map(|d| Some(d).filter(|d| !d.trim().is_empty())),
            };
            print_json(&projects.update(&id, &patch)?)?;
        }
        ProjectAction::Delete { id } => {
            projects.delete(&id)?;
            print_json(&json!({ "deactivated": id }))?;
        }
    }
    Ok(())
}
