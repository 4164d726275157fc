//! Projects group tasks under a label and a color.
//!
//! Deleting a project only deactivates it. Tasks keep whatever project id
//! they had and callers resolve it through [`ProjectStore::resolve`], which
//! treats inactive or unknown ids as "no project".

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::storage::Store;
use crate::task::{normalize_text, validate_title};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
}

fn validate_color(color: &str) -> std::result::Result<String, ValidationError> {
    let trimmed = color.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field: "color" });
    }
    Ok(trimmed.to_string())
}

/// Handle over the project collection. Clones share the same state.
#[derive(Clone)]
pub struct ProjectStore {
    store: Arc<dyn Store>,
    projects: Arc<Mutex<Vec<Project>>>,
}

impl ProjectStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            projects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Project>> {
        self.projects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload the active projects from the store.
    pub fn load(&self) -> Result<()> {
        let active: Vec<Project> = self
            .store
            .list_projects()?
            .into_iter()
            .filter(|p| p.active)
            .collect();
        *self.lock() = active;
        Ok(())
    }

    /// Active projects, newest first.
    pub fn projects(&self) -> Vec<Project> {
        self.lock().clone()
    }

    pub fn create(&self, title: &str, color: &str, description: Option<String>) -> Result<Project> {
        let title = validate_title(title)?;
        let color = validate_color(color)?;
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            title,
            color,
            description: normalize_text(description),
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_project(&project)?;
        self.lock().insert(0, project.clone());
        tracing::debug!(project_id = %project.id, "project created");
        Ok(project)
    }

    pub fn update(&self, id: &str, patch: &ProjectPatch) -> Result<Project> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let color = patch.color.as_deref().map(validate_color).transpose()?;

        let mut project = self.fetch(id)?;
        if let Some(title) = title {
            project.title = title;
        }
        if let Some(color) = color {
            project.color = color;
        }
        if let Some(description) = &patch.description {
            project.description = normalize_text(description.clone());
        }
        project.updated_at = Utc::now();
        self.store.update_project(&project)?;

        let mut projects = self.lock();
        if let Some(slot) = projects.iter_mut().find(|p| p.id == id) {
            *slot = project.clone();
        }
        Ok(project)
    }

    /// Soft delete: the project stays in the store with `active = false`.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut project = self.fetch(id)?;
        if project.active {
            project.active = false;
            project.updated_at = Utc::now();
            self.store.update_project(&project)?;
        }
        self.lock().retain(|p| p.id != id);
        tracing::debug!(project_id = id, "project deactivated");
        Ok(())
    }

    /// Resolve a task's project reference; inactive or unknown ids are `None`.
    pub fn resolve(&self, project_id: Option<&str>) -> Option<Project> {
        let id = project_id?;
        self.lock().iter().find(|p| p.id == id).cloned()
    }

    fn fetch(&self, id: &str) -> Result<Project> {
        self.store.get_project(id)?.ok_or_else(|| {
            ValidationError::NotFound {
                kind: "project",
                id: id.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, ProjectStore) {
        let backend = Arc::new(MemoryStore::new());
        (backend.clone(), ProjectStore::new(backend))
    }

    #[test]
    fn create_prepends_and_validates() {
        let (_, projects) = store();
        projects.create("Alpha", "#ff0000", None).unwrap();
        projects.create("Beta", "blue", Some("second".into())).unwrap();
        let titles: Vec<_> = projects.projects().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Beta", "Alpha"]);

        assert!(projects.create(" ", "red", None).is_err());
        assert!(projects.create("Gamma", "", None).is_err());
        assert_eq!(projects.projects().len(), 2);
    }

    #[test]
    fn delete_is_soft() {
        let (backend, projects) = store();
        let p = projects.create("Alpha", "red", None).unwrap();
        projects.delete(&p.id).unwrap();

        assert!(projects.projects().is_empty());
        assert!(projects.resolve(Some(&p.id)).is_none());
        let stored = backend.get_project(&p.id).unwrap().unwrap();
        assert!(!stored.active);
    }

    #[test]
    fn update_changes_only_given_fields() {
        let (_, projects) = store();
        let p = projects.create("Alpha", "red", Some("desc".into())).unwrap();
        let updated = projects
            .update(
                &p.id,
                &ProjectPatch {
                    color: Some("green".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Alpha");
        assert_eq!(updated.color, "green");
        assert_eq!(updated.description.as_deref(), Some("desc"));
        assert_eq!(projects.resolve(Some(&p.id)).unwrap().color, "green");
    }

    #[test]
    fn update_unknown_project_fails() {
        let (_, projects) = store();
        assert!(projects.update("nope", &ProjectPatch::default()).is_err());
    }

    #[test]
    fn load_skips_inactive() {
        let (backend, projects) = store();
        let keep = projects.create("Keep", "red", None).unwrap();
        let drop = projects.create("Drop", "red", None).unwrap();
        projects.delete(&drop.id).unwrap();

        let fresh = ProjectStore::new(backend);
        fresh.load().unwrap();
        let ids: Vec<_> = fresh.projects().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![keep.id]);
    }
}
