use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::{Task, TaskPatch};
use crate::error::{Result, ValidationError};
use crate::storage::Store;

#[derive(Debug, Default)]
struct TaskLists {
    active: Vec<Task>,
    archived: Vec<Task>,
}

impl TaskLists {
    fn find(&self, id: &str) -> Option<&Task> {
        self.active
            .iter()
            .chain(self.archived.iter())
            .find(|t| t.id == id)
    }

    fn replace(&mut self, task: &Task) {
        if let Some(slot) = self
            .active
            .iter_mut()
            .chain(self.archived.iter_mut())
            .find(|t| t.id == task.id)
        {
            *slot = task.clone();
        }
    }

    fn remove(&mut self, id: &str) {
        self.active.retain(|t| t.id != id);
        self.archived.retain(|t| t.id != id);
    }
}

/// Handle over the active and archived task lists.
///
/// The two lists are disjoint. Every write goes to the store first; the
/// in-memory lists only change once the store accepted it. Clones share
/// the same lists, so the timer engine and the UI see the same tasks.
#[derive(Clone)]
pub struct TaskStore {
    store: Arc<dyn Store>,
    lists: Arc<Mutex<TaskLists>>,
}

impl TaskStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            lists: Arc::new(Mutex::new(TaskLists::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskLists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload both lists from the store.
    pub fn load(&self) -> Result<()> {
        let active = self.store.list_tasks(false)?;
        let archived = self.store.list_tasks(true)?;
        *self.lock() = TaskLists { active, archived };
        Ok(())
    }

    pub fn active(&self) -> Vec<Task> {
        self.lock().active.clone()
    }

    pub fn archived(&self) -> Vec<Task> {
        self.lock().archived.clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock().find(id).cloned()
    }

    pub fn create(
        &self,
        title: &str,
        estimated_pomodoros: u32,
        project_id: Option<String>,
        description: Option<String>,
    ) -> Result<Task> {
        let task = Task::new(title, estimated_pomodoros, project_id, description)?;
        self.store.insert_task(&task)?;
        self.lock().active.insert(0, task.clone());
        tracing::debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Apply a partial edit. An empty patch returns the task untouched.
    pub fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let mut task = self.fetch(id)?;
        if patch.is_empty() {
            return Ok(task);
        }
        task.apply(patch)?;
        self.store.update_task(&task)?;
        self.lock().replace(&task);
        Ok(task)
    }

    /// Flip the completion flag. The archived flag is left alone.
    pub fn toggle_completion(&self, id: &str) -> Result<Task> {
        let mut task = self.fetch(id)?;
        task.completed = !task.completed;
        task.updated_at = Utc::now();
        self.store.update_task(&task)?;
        self.lock().replace(&task);
        Ok(task)
    }

    /// Add one completed work interval. The estimate is not a cap.
    ///
    /// Returns `None` when the task does not exist.
    pub fn increment_completed(&self, id: &str) -> Result<Option<Task>> {
        let Some(task) = self.store.increment_task_completed(id, Utc::now())? else {
            tracing::debug!(task_id = id, "increment for unknown task ignored");
            return Ok(None);
        };
        self.lock().replace(&task);
        tracing::debug!(
            task_id = id,
            completed = task.completed_pomodoros,
            remaining = task.remaining_pomodoros(),
            "task progress incremented"
        );
        Ok(Some(task))
    }

    pub fn archive(&self, id: &str) -> Result<Task> {
        self.move_task(id, true)
    }

    pub fn unarchive(&self, id: &str) -> Result<Task> {
        self.move_task(id, false)
    }

    /// Hard delete from whichever list holds the task.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.delete_task(id)?;
        self.lock().remove(id);
        tracing::debug!(task_id = id, "task deleted");
        Ok(())
    }

    /// Move every completed active task to the archive in one step.
    ///
    /// Returns the moved tasks in their previous order.
    pub fn archive_all_completed(&self) -> Result<Vec<Task>> {
        let moved = self.store.archive_completed_tasks(Utc::now())?;
        if moved.is_empty() {
            return Ok(moved);
        }
        let ids: HashSet<&str> = moved.iter().map(|t| t.id.as_str()).collect();

        let mut lists = self.lock();
        lists.active.retain(|t| !ids.contains(t.id.as_str()));
        lists.archived.retain(|t| !ids.contains(t.id.as_str()));
        let mut archived = moved.clone();
        archived.append(&mut lists.archived);
        lists.archived = archived;
        drop(lists);

        tracing::info!(count = moved.len(), "archived completed tasks");
        Ok(moved)
    }

    fn move_task(&self, id: &str, archived: bool) -> Result<Task> {
        let task = self
            .store
            .set_task_archived(id, archived, Utc::now())?
            .ok_or_else(|| not_found(id))?;

        let mut lists = self.lock();
        lists.remove(id);
        if task.archived {
            lists.archived.insert(0, task.clone());
        } else {
            lists.active.insert(0, task.clone());
        }
        Ok(task)
    }

    fn fetch(&self, id: &str) -> Result<Task> {
        if let Some(task) = self.get(id) {
            return Ok(task);
        }
        self.store.get_task(id)?.ok_or_else(|| not_found(id).into())
    }
}

fn not_found(id: &str) -> ValidationError {
    ValidationError::NotFound {
        kind: "task",
        id: id.to_string(),
    }
}
