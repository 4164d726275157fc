//! Database schema migrations for focusloop.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: base tables.
///
/// `tasks.rank` orders each partition; the highest rank is shown first.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT PRIMARY KEY,
            title               TEXT NOT NULL,
            description         TEXT,
            project_id          TEXT,
            estimated_pomodoros INTEGER NOT NULL,
            completed_pomodoros INTEGER NOT NULL DEFAULT 0,
            completed           INTEGER NOT NULL DEFAULT 0,
            archived            INTEGER NOT NULL DEFAULT 0,
            rank                INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            color       TEXT NOT NULL,
            description TEXT,
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id                    TEXT PRIMARY KEY,
            interval_type         TEXT NOT NULL,
            planned_duration_secs INTEGER NOT NULL,
            task_id               TEXT,
            status                TEXT NOT NULL,
            started_at            TEXT NOT NULL,
            ended_at              TEXT
        );

        CREATE TABLE IF NOT EXISTS settings (
            id                   INTEGER PRIMARY KEY CHECK (id = 1),
            pomodoro_length      INTEGER NOT NULL,
            short_break_length   INTEGER NOT NULL,
            long_break_length    INTEGER NOT NULL,
            auto_start_breaks    INTEGER NOT NULL,
            auto_start_pomodoros INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_archived_rank ON tasks(archived, rank);
        CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: long-break cadence setting and the single-active-session index.
///
/// Databases written before the index existed may hold several active
/// sessions; all but the newest are canceled first.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "ALTER TABLE settings ADD COLUMN long_break_interval INTEGER NOT NULL DEFAULT 0;

         UPDATE sessions SET status = 'canceled'
         WHERE status = 'active'
           AND id NOT IN (
               SELECT id FROM sessions WHERE status = 'active'
               ORDER BY started_at DESC LIMIT 1
           );

         CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_single_active
             ON sessions(status) WHERE status = 'active';",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: link a resumed session to the one its pause superseded.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("ALTER TABLE sessions ADD COLUMN resumes_session_id TEXT;")?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}
