//! Shared helpers for the core integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use focusloop_core::{
    IntervalType, MemoryStore, Notifier, Project, Session, SessionRecorder, Settings,
    SettingsStore, Store, StoreError, Task, TaskStore, TimerEngine,
};
use focusloop_core::timer::EngineOptions;

// ============================================================================
// Fault-injecting store
// ============================================================================

/// Store wrapper that fails selected operations with `StoreError::Unavailable`.
///
/// Operations are named after the `Store` method, e.g. `"update_session"`.
pub struct FaultyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<&'static str>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(op) {
            Err(StoreError::Unavailable(format!("{op}: injected failure")))
        } else {
            Ok(())
        }
    }
}

impl Store for FaultyStore {
    fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.check("insert_task")?;
        self.inner.insert_task(task)
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        self.check("update_task")?;
        self.inner.update_task(task)
    }

    fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.check("delete_task")?;
        self.inner.delete_task(id)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        self.check("get_task")?;
        self.inner.get_task(id)
    }

    fn list_tasks(&self, archived: bool) -> Result<Vec<Task>, StoreError> {
        self.check("list_tasks")?;
        self.inner.list_tasks(archived)
    }

    fn set_task_archived(
        &self,
        id: &str,
        archived: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        self.check("set_task_archived")?;
        self.inner.set_task_archived(id, archived, at)
    }

    fn increment_task_completed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        self.check("increment_task_completed")?;
        self.inner.increment_task_completed(id, at)
    }

    fn archive_completed_tasks(&self, at: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        self.check("archive_completed_tasks")?;
        self.inner.archive_completed_tasks(at)
    }

    fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.check("insert_project")?;
        self.inner.insert_project(project)
    }

    fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        self.check("update_project")?;
        self.inner.update_project(project)
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        self.check("get_project")?;
        self.inner.get_project(id)
    }

    fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.check("list_projects")?;
        self.inner.list_projects()
    }

    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.check("insert_session")?;
        self.inner.insert_session(session)
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        self.check("update_session")?;
        self.inner.update_session(session)
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.check("get_session")?;
        self.inner.get_session(id)
    }

    fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        self.check("list_sessions")?;
        self.inner.list_sessions()
    }

    fn cancel_active_sessions(&self) -> Result<Vec<String>, StoreError> {
        self.check("cancel_active_sessions")?;
        self.inner.cancel_active_sessions()
    }

    fn load_settings(&self) -> Result<Option<Settings>, StoreError> {
        self.check("load_settings")?;
        self.inner.load_settings()
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.check("save_settings")?;
        self.inner.save_settings(settings)
    }
}

// ============================================================================
// Engine wiring
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<IntervalType>>);

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<IntervalType> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn interval_completed(&self, interval: IntervalType, _message_key: &str) {
        self.0.lock().unwrap().push(interval);
    }
}

pub struct Harness<S: Store + 'static> {
    pub store: Arc<S>,
    pub settings: SettingsStore,
    pub tasks: TaskStore,
    pub recorder: SessionRecorder,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: TimerEngine,
}

pub fn harness<S: Store + 'static>(store: S, auto_advance_delay_secs: u32) -> Harness<S> {
    let store = Arc::new(store);
    let settings = SettingsStore::new(store.clone());
    let tasks = TaskStore::new(store.clone());
    let recorder = SessionRecorder::new(store.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = TimerEngine::new(
        settings.clone(),
        recorder.clone(),
        tasks.clone(),
        notifier.clone(),
    )
    .with_options(EngineOptions {
        auto_advance_delay_secs,
    });
    Harness {
        store,
        settings,
        tasks,
        recorder,
        notifier,
        engine,
    }
}

/// Tick until the running interval completes. Returns the number of ticks.
pub fn run_to_completion(engine: &mut TimerEngine) -> u64 {
    let mut ticks = 0;
    while engine.is_running() {
        ticks += 1;
        if engine.tick().completed().is_some() {
            break;
        }
    }
    ticks
}

pub fn active_sessions(store: &dyn Store) -> usize {
    store
        .list_sessions()
        .unwrap()
        .iter()
        .filter(|s| s.status == focusloop_core::SessionStatus::Active)
        .count()
}
