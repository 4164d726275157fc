use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::Session;
use crate::timer::{IntervalType, TimerState};

/// Every timer state change produces an Event.
/// The UI renders them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        interval_type: IntervalType,
        remaining_secs: u64,
        session_id: Option<String>,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        interval_type: IntervalType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalSwitched {
        from: IntervalType,
        to: IntervalType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        interval_type: IntervalType,
        session_id: Option<String>,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// The next interval will start once `delay_secs` more ticks have passed.
    AutoAdvanceScheduled {
        next: IntervalType,
        delay_secs: u32,
        after_session: Option<String>,
        at: DateTime<Utc>,
    },
    AutoAdvanceCanceled {
        next: IntervalType,
        at: DateTime<Utc>,
    },
    /// Stale active session from an earlier run was closed.
    SessionRecovered {
        session_id: String,
        at: DateTime<Utc>,
    },
}

/// Which store call a [`Warning`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    OpenSession,
    CancelSession,
    CompleteSession,
    IncrementTask,
    LoadSettings,
    RecoverSession,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::OpenSession => "open session",
            Operation::CancelSession => "cancel session",
            Operation::CompleteSession => "complete session",
            Operation::IncrementTask => "increment task",
            Operation::LoadSettings => "load settings",
            Operation::RecoverSession => "recover session",
        };
        f.write_str(s)
    }
}

/// A persistence failure the engine absorbed. The timer kept going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub operation: Operation,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.message)
    }
}

/// Everything a single timer command produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    pub events: Vec<Event>,
    /// Session opened by this command, if the store accepted it.
    pub session: Option<Session>,
    pub warnings: Vec<Warning>,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.session.is_none() && self.warnings.is_empty()
    }

    /// True if an interval ran out during this command.
    pub fn completed(&self) -> Option<IntervalType> {
        self.events.iter().find_map(|e| match e {
            Event::TimerCompleted { interval_type, .. } => Some(*interval_type),
            _ => None,
        })
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn warn(&mut self, operation: Operation, message: impl fmt::Display) {
        let warning = Warning {
            operation,
            message: message.to_string(),
        };
        tracing::warn!(%warning, "store failure absorbed by timer");
        self.warnings.push(warning);
    }

    pub(crate) fn merge(&mut self, other: Outcome) {
        self.events.extend(other.events);
        if other.session.is_some() {
            self.session = other.session;
        }
        self.warnings.extend(other.warnings);
    }
}

/// Plain-value view of the timer for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub is_running: bool,
    pub interval_type: IntervalType,
    pub time_left_secs: u64,
    pub total_secs: u64,
    pub active_task_id: Option<String>,
    pub session_id: Option<String>,
    /// Interval waiting to auto-start, if any.
    pub pending_next: Option<IntervalType>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged() {
        let event = Event::TimerPaused {
            remaining_secs: 42,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "timer_paused");
        assert_eq!(json["remaining_secs"], 42);
    }

    #[test]
    fn outcome_reports_completion() {
        let mut out = Outcome::default();
        assert!(out.is_empty());
        assert_eq!(out.completed(), None);
        out.push(Event::TimerCompleted {
            interval_type: IntervalType::ShortBreak,
            session_id: None,
            task_id: None,
            at: Utc::now(),
        });
        assert_eq!(out.completed(), Some(IntervalType::ShortBreak));
    }

    #[test]
    fn warning_display() {
        let mut out = Outcome::default();
        out.warn(Operation::CompleteSession, "backend down");
        assert_eq!(
            out.warnings[0].to_string(),
            "complete session failed: backend down"
        );
    }
}
