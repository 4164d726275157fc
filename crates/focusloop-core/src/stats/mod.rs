//! Summary statistics derived from the session history.
//!
//! Nothing here is stored: every [`StatsAggregator::refresh`] reads the full
//! history and recomputes. Only `completed` sessions count towards totals;
//! canceled ones are counted but contribute no time. A session closed by a
//! pause and continued under a new session is not counted as canceled.

mod streak;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::{Session, SessionStatus};
use crate::storage::Store;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub completed_pomodoros: u32,
    pub completed_breaks: u32,
    pub canceled_sessions: u32,
    pub focus_secs: u64,
    pub break_secs: u64,
    pub today_pomodoros: u32,
    pub today_focus_secs: u64,
    /// Consecutive UTC days, ending today or yesterday, with a completed work interval.
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    /// Completed work intervals per bound task id.
    pub pomodoros_by_task: BTreeMap<String, u32>,
}

/// Read-only view over the session history.
#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn Store>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn refresh(&self) -> Result<Stats, StoreError> {
        let sessions = self.store.list_sessions()?;
        let stats = compute(&sessions, Utc::now());
        tracing::debug!(
            sessions = sessions.len(),
            pomodoros = stats.completed_pomodoros,
            "stats refreshed"
        );
        Ok(stats)
    }
}

/// Fold a session history into [`Stats`] as of `now`.
///
/// A session belongs to the UTC day it ended on, falling back to its start.
/// Its time is the planned duration of the interval, which a resumed
/// session carries in full.
pub fn compute(sessions: &[Session], now: DateTime<Utc>) -> Stats {
    let today = now.date_naive();
    let mut stats = Stats::default();
    let mut focus_days: BTreeSet<NaiveDate> = BTreeSet::new();
    let paused: HashSet<&str> = sessions.iter().filter_map(|s| s.resumes.as_deref()).collect();

    for session in sessions {
        match session.status {
            SessionStatus::Canceled => {
                if !paused.contains(session.id.as_str()) {
                    stats.canceled_sessions += 1;
                }
                continue;
            }
            SessionStatus::Active => continue,
            SessionStatus::Completed => {}
        }

        let day = session.ended_at.unwrap_or(session.started_at).date_naive();
        let secs = session.planned_duration_secs;

        if session.interval_type.is_break() {
            stats.completed_breaks += 1;
            stats.break_secs += secs;
            continue;
        }

        stats.completed_pomodoros += 1;
        stats.focus_secs += secs;
        if day == today {
            stats.today_pomodoros += 1;
            stats.today_focus_secs += secs;
        }
        if let Some(task_id) = &session.task_id {
            *stats.pomodoros_by_task.entry(task_id.clone()).or_default() += 1;
        }
        focus_days.insert(day);
    }

    let days: Vec<NaiveDate> = focus_days.into_iter().collect();
    let (current, longest) = streak::day_streaks(&days, today);
    stats.current_streak_days = current;
    stats.longest_streak_days = longest;
    stats
}
