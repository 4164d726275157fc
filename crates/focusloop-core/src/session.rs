//! Session records and the recorder that opens and closes them.
//!
//! A session is the durable trace of one interval. It is opened when the
//! timer starts, and ends either `completed` (countdown reached zero) or
//! `canceled` (reset, superseded, or recovered after a crash). Only one
//! session is ever `active` at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::storage::Store;
use crate::timer::IntervalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Canceled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "completed" => Some(SessionStatus::Completed),
            "canceled" => Some(SessionStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub interval_type: IntervalType,
    pub planned_duration_secs: u64,
    /// Fixed at creation.
    pub task_id: Option<String>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    /// Only set on completion.
    pub ended_at: Option<DateTime<Utc>>,
    /// Session this one continues after a pause. That session ends
    /// `canceled` but is not an abandoned interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumes: Option<String>,
}

impl Session {
    fn open(
        interval_type: IntervalType,
        planned_duration_secs: u64,
        task_id: Option<String>,
        resumes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            interval_type,
            planned_duration_secs,
            task_id,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
            resumes,
        }
    }
}

/// Opens, cancels and completes session records through the store.
#[derive(Clone)]
pub struct SessionRecorder {
    store: Arc<dyn Store>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open a new active session, canceling any session still active.
    pub fn open(
        &self,
        interval_type: IntervalType,
        duration_secs: u64,
        task_id: Option<&str>,
    ) -> Result<Session, StoreError> {
        self.insert(Session::open(
            interval_type,
            duration_secs,
            task_id.map(str::to_string),
            None,
        ))
    }

    /// Open the continuation of a paused interval.
    ///
    /// `duration_secs` is the full length of the interval, not the time
    /// left, so the completed record describes the whole interval.
    pub fn resume(
        &self,
        previous_id: &str,
        interval_type: IntervalType,
        duration_secs: u64,
        task_id: Option<&str>,
    ) -> Result<Session, StoreError> {
        self.insert(Session::open(
            interval_type,
            duration_secs,
            task_id.map(str::to_string),
            Some(previous_id.to_string()),
        ))
    }

    fn insert(&self, session: Session) -> Result<Session, StoreError> {
        let superseded = self.store.cancel_active_sessions()?;
        if !superseded.is_empty() {
            tracing::info!(count = superseded.len(), "canceled superseded active session(s)");
        }
        self.store.insert_session(&session)?;
        tracing::debug!(
            session_id = %session.id,
            interval = %session.interval_type,
            duration_secs = session.planned_duration_secs,
            resumes = ?session.resumes,
            "session opened"
        );
        Ok(session)
    }

    /// Cancel a session. Terminal and unknown sessions are left alone.
    pub fn cancel(&self, session_id: &str) -> Result<(), StoreError> {
        let Some(mut session) = self.store.get_session(session_id)? else {
            tracing::debug!(session_id, "cancel for unknown session ignored");
            return Ok(());
        };
        if session.status.is_terminal() {
            return Ok(());
        }
        session.status = SessionStatus::Canceled;
        self.store.update_session(&session)?;
        tracing::debug!(session_id, "session canceled");
        Ok(())
    }

    /// Mark a session completed.
    ///
    /// A session that already ended is returned unchanged. An unknown id
    /// yields `None`.
    pub fn complete(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let Some(mut session) = self.store.get_session(session_id)? else {
            tracing::debug!(session_id, "complete for unknown session ignored");
            return Ok(None);
        };
        if session.status.is_terminal() {
            return Ok(Some(session));
        }
        session.status = SessionStatus::Completed;
        session.ended_at = Some(Utc::now());
        self.store.update_session(&session)?;
        tracing::info!(
            session_id,
            interval = %session.interval_type,
            "session completed"
        );
        Ok(Some(session))
    }

    /// The session currently active, if any.
    pub fn active(&self) -> Result<Option<Session>, StoreError> {
        Ok(self
            .store
            .list_sessions()?
            .into_iter()
            .find(|s| s.status == SessionStatus::Active))
    }

    /// Every recorded session, oldest first.
    pub fn history(&self) -> Result<Vec<Session>, StoreError> {
        self.store.list_sessions()
    }
}
