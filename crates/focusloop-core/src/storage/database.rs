//! SQLite implementation of the persistence port.
//!
//! Provides durable storage for:
//! - Tasks (active and archived partitions, ordered by rank)
//! - Projects (soft-deleted via the `active` flag)
//! - Sessions, with a partial unique index guaranteeing one active row
//! - The settings singleton

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations, Store};
use crate::error::{CoreError, StoreError};
use crate::project::Project;
use crate::session::{Session, SessionStatus};
use crate::settings::Settings;
use crate::task::Task;
use crate::timer::IntervalType;

const TASK_COLUMNS: &str = "id, title, description, project_id, estimated_pomodoros,
     completed_pomodoros, completed, archived, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, title, color, description, active, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, interval_type, planned_duration_secs, task_id, status,
     started_at, ended_at, resumes_session_id";

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_task(row: &Row) -> Result<Task, rusqlite::Error> {
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        project_id: row.get(3)?,
        estimated_pomodoros: row.get(4)?,
        completed_pomodoros: row.get(5)?,
        completed: row.get(6)?,
        archived: row.get(7)?,
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

fn row_to_project(row: &Row) -> Result<Project, rusqlite::Error> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        color: row.get(2)?,
        description: row.get(3)?,
        active: row.get(4)?,
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

fn row_to_session(row: &Row) -> Result<Session, rusqlite::Error> {
    let interval: String = row.get(1)?;
    let status: String = row.get(4)?;
    let started_at: String = row.get(5)?;
    let ended_at: Option<String> = row.get(6)?;
    Ok(Session {
        id: row.get(0)?,
        interval_type: interval.parse().unwrap_or(IntervalType::Work),
        planned_duration_secs: row.get(2)?,
        task_id: row.get(3)?,
        // Unknown statuses are treated as canceled so they never block a new session.
        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Canceled),
        started_at: parse_datetime_fallback(&started_at),
        ended_at: ended_at.as_deref().map(parse_datetime_fallback),
        resumes: row.get(7)?,
    })
}

/// SQLite-backed [`Store`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data_dir>/focusloop.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focusloop.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and ephemeral runs).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_tasks(conn: &Connection, archived: bool) -> Result<Vec<Task>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE archived = ?1 ORDER BY rank DESC"
        ))?;
        let rows = stmt.query_map(params![archived], row_to_task)?;
        rows.collect()
    }

    fn query_task(conn: &Connection, id: &str) -> Result<Option<Task>, rusqlite::Error> {
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            row_to_task,
        )
        .optional()
    }

    fn next_rank(conn: &Connection) -> Result<i64, rusqlite::Error> {
        conn.query_row("SELECT COALESCE(MAX(rank), 0) + 1 FROM tasks", [], |row| {
            row.get(0)
        })
    }
}

impl Store for Database {
    fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let conn = self.conn();
        let rank = Self::next_rank(&conn)?;
        conn.execute(
            "INSERT INTO tasks (id, title, description, project_id, estimated_pomodoros,
                completed_pomodoros, completed, archived, rank, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                task.id,
                task.title,
                task.description,
                task.project_id,
                task.estimated_pomodoros,
                task.completed_pomodoros,
                task.completed,
                task.archived,
                rank,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE tasks SET title = ?2, description = ?3, project_id = ?4,
                estimated_pomodoros = ?5, completed_pomodoros = ?6, completed = ?7,
                updated_at = ?8
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.description,
                task.project_id,
                task.estimated_pomodoros,
                task.completed_pomodoros,
                task.completed,
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(Self::query_task(&self.conn(), id)?)
    }

    fn list_tasks(&self, archived: bool) -> Result<Vec<Task>, StoreError> {
        Ok(Self::query_tasks(&self.conn(), archived)?)
    }

    fn set_task_archived(
        &self,
        id: &str,
        archived: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let rank = Self::next_rank(&tx)?;
        tx.execute(
            "UPDATE tasks SET archived = ?2, rank = ?3, updated_at = ?4
             WHERE id = ?1 AND archived != ?2",
            params![id, archived, rank, at.to_rfc3339()],
        )?;
        let task = Self::query_task(&tx, id)?;
        tx.commit()?;
        Ok(task)
    }

    fn increment_task_completed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE tasks SET completed_pomodoros = completed_pomodoros + 1, updated_at = ?2
             WHERE id = ?1",
            params![id, at.to_rfc3339()],
        )?;
        let task = if changed == 0 {
            None
        } else {
            Self::query_task(&tx, id)?
        };
        tx.commit()?;
        Ok(task)
    }

    fn archive_completed_tasks(&self, at: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let moving: Vec<Task> = Self::query_tasks(&tx, false)?
            .into_iter()
            .filter(|t| t.completed)
            .collect();
        let base = Self::next_rank(&tx)?;
        let count = moving.len() as i64;
        let mut moved = Vec::with_capacity(moving.len());
        // First task in display order gets the highest rank.
        for (i, mut task) in moving.into_iter().enumerate() {
            tx.execute(
                "UPDATE tasks SET archived = 1, rank = ?2, updated_at = ?3 WHERE id = ?1",
                params![task.id, base + count - 1 - i as i64, at.to_rfc3339()],
            )?;
            task.archived = true;
            task.updated_at = at;
            moved.push(task);
        }
        tx.commit()?;
        Ok(moved)
    }

    fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO projects (id, title, color, description, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.id,
                project.title,
                project.color,
                project.description,
                project.active,
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn update_project(&self, project: &Project) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE projects SET title = ?2, color = ?3, description = ?4, active = ?5,
                updated_at = ?6
             WHERE id = ?1",
            params![
                project.id,
                project.title,
                project.color,
                project.description,
                project.active,
                project.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let conn = self.conn();
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, rowid DESC"
        ))?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO sessions (id, interval_type, planned_duration_secs, task_id, status,
                started_at, ended_at, resumes_session_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id,
                session.interval_type.as_str(),
                session.planned_duration_secs,
                session.task_id,
                session.status.as_str(),
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
                session.resumes,
            ],
        )?;
        Ok(())
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        // task_id is deliberately absent: it is fixed at creation.
        self.conn().execute(
            "UPDATE sessions SET status = ?2, ended_at = ?3 WHERE id = ?1",
            params![
                session.id,
                session.status.as_str(),
                session.ended_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.conn();
        let session = conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at ASC, rowid ASC"
        ))?;
        let sessions = stmt
            .query_map([], row_to_session)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn cancel_active_sessions(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let ids = {
            let mut stmt = tx.prepare("SELECT id FROM sessions WHERE status = 'active'")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };
        tx.execute(
            "UPDATE sessions SET status = 'canceled' WHERE status = 'active'",
            [],
        )?;
        tx.commit()?;
        Ok(ids)
    }

    fn load_settings(&self) -> Result<Option<Settings>, StoreError> {
        let conn = self.conn();
        let settings = conn
            .query_row(
                "SELECT pomodoro_length, short_break_length, long_break_length,
                        auto_start_breaks, auto_start_pomodoros, long_break_interval
                 FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(Settings {
                        pomodoro_length: row.get(0)?,
                        short_break_length: row.get(1)?,
                        long_break_length: row.get(2)?,
                        auto_start_breaks: row.get(3)?,
                        auto_start_pomodoros: row.get(4)?,
                        long_break_interval: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(settings)
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO settings (id, pomodoro_length, short_break_length,
                long_break_length, auto_start_breaks, auto_start_pomodoros, long_break_interval)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                settings.pomodoro_length,
                settings.short_break_length,
                settings.long_break_length,
                settings.auto_start_breaks,
                settings.auto_start_pomodoros,
                settings.long_break_interval,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str) -> Task {
        Task::new(title, 2, None, None).unwrap()
    }

    fn titles(tasks: Vec<Task>) -> Vec<String> {
        tasks.into_iter().map(|t| t.title).collect()
    }

    #[test]
    fn task_partitions_and_order() {
        let db = Database::open_memory().unwrap();
        let a = task("a");
        let b = task("b");
        db.insert_task(&a).unwrap();
        db.insert_task(&b).unwrap();
        assert_eq!(titles(db.list_tasks(false).unwrap()), vec!["b", "a"]);

        let moved = db.set_task_archived(&a.id, true, Utc::now()).unwrap().unwrap();
        assert!(moved.archived);
        assert_eq!(titles(db.list_tasks(false).unwrap()), vec!["b"]);
        assert_eq!(titles(db.list_tasks(true).unwrap()), vec!["a"]);
    }

    #[test]
    fn increment_is_atomic_and_reports_missing() {
        let db = Database::open_memory().unwrap();
        let a = task("a");
        db.insert_task(&a).unwrap();
        db.increment_task_completed(&a.id, Utc::now()).unwrap();
        let t = db.increment_task_completed(&a.id, Utc::now()).unwrap().unwrap();
        assert_eq!(t.completed_pomodoros, 2);
        assert!(db.increment_task_completed("ghost", Utc::now()).unwrap().is_none());
    }

    #[test]
    fn bulk_archive_preserves_order_and_prepends() {
        let db = Database::open_memory().unwrap();
        let old = task("old");
        db.insert_task(&old).unwrap();
        db.set_task_archived(&old.id, true, Utc::now()).unwrap();

        for (title, done) in [("t1", true), ("t2", false), ("t3", true)] {
            let mut t = task(title);
            t.completed = done;
            db.insert_task(&t).unwrap();
        }
        // Active display order: t3, t2, t1
        let moved = db.archive_completed_tasks(Utc::now()).unwrap();
        assert_eq!(titles(moved), vec!["t3", "t1"]);
        assert_eq!(titles(db.list_tasks(false).unwrap()), vec!["t2"]);
        assert_eq!(titles(db.list_tasks(true).unwrap()), vec!["t3", "t1", "old"]);
    }

    #[test]
    fn session_roundtrip_and_single_active_index() {
        let db = Database::open_memory().unwrap();
        let mut s = Session {
            id: "s1".into(),
            interval_type: IntervalType::LongBreak,
            planned_duration_secs: 900,
            task_id: Some("t".into()),
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
            resumes: None,
        };
        db.insert_session(&s).unwrap();

        let mut dup = s.clone();
        dup.id = "s2".into();
        dup.resumes = Some("s1".into());
        assert!(db.insert_session(&dup).is_err());

        s.status = SessionStatus::Completed;
        s.ended_at = Some(Utc::now());
        s.task_id = Some("changed".into());
        db.update_session(&s).unwrap();

        let stored = db.get_session("s1").unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.interval_type, IntervalType::LongBreak);
        assert_eq!(stored.task_id.as_deref(), Some("t"));
        assert!(stored.ended_at.is_some());
        assert_eq!(stored.resumes, None);
        db.insert_session(&dup).unwrap();
        assert_eq!(db.get_session("s2").unwrap().unwrap().resumes.as_deref(), Some("s1"));
        assert_eq!(db.cancel_active_sessions().unwrap(), vec!["s2".to_string()]);
    }

    #[test]
    fn settings_singleton() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_settings().unwrap().is_none());
        let mut s = Settings::default();
        s.pomodoro_length = 50;
        s.long_break_interval = 4;
        db.save_settings(&s).unwrap();
        db.save_settings(&s).unwrap();
        assert_eq!(db.load_settings().unwrap(), Some(s));
    }

    #[test]
    fn projects_soft_delete_persists() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let mut p = Project {
            id: "p1".into(),
            title: "Alpha".into(),
            color: "red".into(),
            description: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        db.insert_project(&p).unwrap();
        p.active = false;
        db.update_project(&p).unwrap();
        let listed = db.list_projects().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].active);
    }
}
