//! In-memory implementation of the persistence port.
//!
//! Used by tests and by ephemeral runs that do not need durability.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::Store;
use crate::error::StoreError;
use crate::project::Project;
use crate::session::{Session, SessionStatus};
use crate::settings::Settings;
use crate::task::Task;

#[derive(Default)]
struct State {
    /// Active tasks in display order (front = newest).
    active: Vec<Task>,
    archived: Vec<Task>,
    projects: Vec<Project>,
    sessions: Vec<Session>,
    settings: Option<Settings>,
}

impl State {
    fn list_mut(&mut self, archived: bool) -> &mut Vec<Task> {
        if archived {
            &mut self.archived
        } else {
            &mut self.active
        }
    }

    fn find_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.active
            .iter_mut()
            .chain(self.archived.iter_mut())
            .find(|t| t.id == id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.find_task_mut(&task.id).is_some() {
            return Err(StoreError::QueryFailed(format!("duplicate task id {}", task.id)));
        }
        state.list_mut(task.archived).insert(0, task.clone());
        Ok(())
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut state = self.lock();
        match state.find_task_mut(&task.id) {
            Some(slot) => {
                let archived = slot.archived;
                *slot = task.clone();
                slot.archived = archived;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.active.retain(|t| t.id != id);
        state.archived.retain(|t| t.id != id);
        Ok(())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.lock().find_task_mut(id).map(|t| t.clone()))
    }

    fn list_tasks(&self, archived: bool) -> Result<Vec<Task>, StoreError> {
        Ok(self.lock().list_mut(archived).clone())
    }

    fn set_task_archived(
        &self,
        id: &str,
        archived: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let mut state = self.lock();
        let from = state.list_mut(!archived);
        let Some(pos) = from.iter().position(|t| t.id == id) else {
            return Ok(state.find_task_mut(id).map(|t| t.clone()));
        };
        let mut task = from.remove(pos);
        task.archived = archived;
        task.updated_at = at;
        state.list_mut(archived).insert(0, task.clone());
        Ok(Some(task))
    }

    fn increment_task_completed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let mut state = self.lock();
        Ok(state.find_task_mut(id).map(|task| {
            task.completed_pomodoros = task.completed_pomodoros.saturating_add(1);
            task.updated_at = at;
            task.clone()
        }))
    }

    fn archive_completed_tasks(&self, at: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let mut state = self.lock();
        let (mut moved, kept): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut state.active).into_iter().partition(|t| t.completed);
        for task in &mut moved {
            task.archived = true;
            task.updated_at = at;
        }
        state.active = kept;
        let mut archived = moved.clone();
        archived.append(&mut state.archived);
        state.archived = archived;
        Ok(moved)
    }

    fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.lock().projects.insert(0, project.clone());
        Ok(())
    }

    fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(slot) = state.projects.iter_mut().find(|p| p.id == project.id) {
            *slot = project.clone();
        }
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        Ok(self.lock().projects.iter().find(|p| p.id == id).cloned())
    }

    fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(self.lock().projects.clone())
    }

    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut state = self.lock();
        if session.status == SessionStatus::Active
            && state.sessions.iter().any(|s| s.status == SessionStatus::Active)
        {
            return Err(StoreError::QueryFailed(
                "another session is already active".to_string(),
            ));
        }
        state.sessions.push(session.clone());
        Ok(())
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(slot) = state.sessions.iter_mut().find(|s| s.id == session.id) {
            // Task binding is immutable once recorded.
            let task_id = slot.task_id.clone();
            *slot = session.clone();
            slot.task_id = task_id;
        }
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.lock().sessions.iter().find(|s| s.id == id).cloned())
    }

    fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self.lock().sessions.clone())
    }

    fn cancel_active_sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut state = self.lock();
        let mut canceled = Vec::new();
        for session in state
            .sessions
            .iter_mut()
            .filter(|s| s.status == SessionStatus::Active)
        {
            session.status = SessionStatus::Canceled;
            canceled.push(session.id.clone());
        }
        Ok(canceled)
    }

    fn load_settings(&self) -> Result<Option<Settings>, StoreError> {
        Ok(self.lock().settings.clone())
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.lock().settings = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::IntervalType;

    fn task(title: &str, completed: bool) -> Task {
        let mut t = Task::new(title, 1, None, None).unwrap();
        t.completed = completed;
        t
    }

    #[test]
    fn insert_prepends_into_partition() {
        let store = MemoryStore::new();
        store.insert_task(&task("a", false)).unwrap();
        store.insert_task(&task("b", false)).unwrap();
        let titles: Vec<_> = store
            .list_tasks(false)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["b", "a"]);
        assert!(store.list_tasks(true).unwrap().is_empty());
    }

    #[test]
    fn update_task_cannot_move_partitions() {
        let store = MemoryStore::new();
        let mut t = task("a", false);
        store.insert_task(&t).unwrap();
        t.archived = true;
        t.title = "renamed".into();
        store.update_task(&t).unwrap();
        let active = store.list_tasks(false).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "renamed");
        assert!(!active[0].archived);
    }

    #[test]
    fn set_archived_moves_to_front() {
        let store = MemoryStore::new();
        let a = task("a", false);
        let b = task("b", false);
        store.insert_task(&a).unwrap();
        store.insert_task(&b).unwrap();
        store.set_task_archived(&a.id, true, Utc::now()).unwrap();
        store.set_task_archived(&b.id, true, Utc::now()).unwrap();
        let archived: Vec<_> = store
            .list_tasks(true)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(archived, vec!["b", "a"]);
        assert!(store.list_tasks(false).unwrap().is_empty());
    }

    #[test]
    fn only_one_active_session_accepted() {
        let store = MemoryStore::new();
        let open = |id: &str| Session {
            id: id.to_string(),
            interval_type: IntervalType::Work,
            planned_duration_secs: 60,
            task_id: None,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
            resumes: None,
        };
        store.insert_session(&open("s1")).unwrap();
        assert!(store.insert_session(&open("s2")).is_err());
        assert_eq!(store.cancel_active_sessions().unwrap(), vec!["s1".to_string()]);
        store.insert_session(&open("s2")).unwrap();
    }
}
