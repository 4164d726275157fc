//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine. It does not use
//! internal threads - the caller (usually [`super::driver::run`]) calls
//! `tick()` once per second while there is something to count down.
//!
//! ## State Transitions
//!
//! ```text
//!            start / resume_or_start
//! Idle ─────────────────────────────> Running ──tick to 0──> Idle (+ completion)
//!  ^  ^                                │   ^
//!  │  └──────── reset ─────────────────┤   │ start / resume_or_start
//!  │                                   v   │
//!  └──────────── reset ──────────── Paused─┘
//! ```
//!
//! `start()` keeps its toggle meaning (pausing a running timer) but routes
//! to the explicit `pause` and `resume_or_start` transitions.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(settings, recorder, tasks, notifier);
//! engine.start(Some(&task.id));
//! // Once per second:
//! let outcome = engine.tick(); // outcome.completed() is Some(..) when the interval ends
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::IntervalType;
use crate::events::{Event, Operation, Outcome, TimerSnapshot};
use crate::notify::Notifier;
use crate::session::SessionRecorder;
use crate::settings::{Settings, SettingsStore};
use crate::task::{Task, TaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// Auto-advance waiting for its delay to elapse.
///
/// Keyed by the session that just completed, so a reset in the delay window
/// cancels exactly this continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingContinuation {
    pub after_session: Option<String>,
    pub next: IntervalType,
    pub task_id: Option<String>,
    pub delay_remaining_secs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Ticks to wait between a completed interval and the auto-started next one.
    pub auto_advance_delay_secs: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            auto_advance_delay_secs: 1,
        }
    }
}

/// Core timer engine.
///
/// Owns the countdown and orchestrates the session recorder, the task
/// store and the notifier. Store failures never change the state machine;
/// they come back as warnings in the command's [`Outcome`].
pub struct TimerEngine {
    settings: SettingsStore,
    recorder: SessionRecorder,
    tasks: TaskStore,
    notifier: Arc<dyn Notifier>,
    options: EngineOptions,

    state: TimerState,
    interval_type: IntervalType,
    time_left: u64,
    /// Full length of the current interval, kept across pause and resume.
    total_secs: u64,
    active_task: Option<String>,
    session_id: Option<String>,
    pending: Option<PendingContinuation>,
    /// Work intervals completed since the last long break.
    work_streak: u32,
}

impl TimerEngine {
    /// Create an idle engine on a full work interval.
    pub fn new(
        settings: SettingsStore,
        recorder: SessionRecorder,
        tasks: TaskStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut engine = Self {
            settings,
            recorder,
            tasks,
            notifier,
            options: EngineOptions::default(),
            state: TimerState::Idle,
            interval_type: IntervalType::Work,
            time_left: 0,
            total_secs: 0,
            active_task: None,
            session_id: None,
            pending: None,
            work_streak: 0,
        };
        let mut out = Outcome::default();
        engine.load_interval(engine.interval_type, &mut out);
        engine
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Seconds left in the current interval.
    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn interval_type(&self) -> IntervalType {
        self.interval_type
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.active_task.as_deref()
    }

    /// The bound task as currently held by the task store.
    pub fn active_task(&self) -> Option<Task> {
        self.tasks.get(self.active_task.as_deref()?)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn pending_continuation(&self) -> Option<&PendingContinuation> {
        self.pending.as_ref()
    }

    /// Whether a clock should keep ticking this engine.
    pub fn needs_ticks(&self) -> bool {
        self.state == TimerState::Running || self.pending.is_some()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            is_running: self.is_running(),
            interval_type: self.interval_type,
            time_left_secs: self.time_left,
            total_secs: self.total_secs,
            active_task_id: self.active_task.clone(),
            session_id: self.session_id.clone(),
            pending_next: self.pending.as_ref().map(|p| p.next),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume; pauses instead when already running.
    pub fn start(&mut self, task_id: Option<&str>) -> Outcome {
        match self.state {
            TimerState::Running => self.pause(),
            TimerState::Idle | TimerState::Paused => self.resume_or_start(task_id),
        }
    }

    /// Open a session and run. From `Idle` the countdown is reloaded from
    /// settings; from `Paused` it continues where it stopped, under a new
    /// session linked to the paused one.
    ///
    /// A store failure still leaves the engine running, without a session.
    pub fn resume_or_start(&mut self, task_id: Option<&str>) -> Outcome {
        let mut out = Outcome::default();
        if self.state == TimerState::Running {
            return out;
        }
        if let Some(pending) = self.pending.take() {
            tracing::debug!(next = %pending.next, "manual start supersedes auto-advance");
        }

        if self.state == TimerState::Idle {
            self.load_interval(self.interval_type, &mut out);
        }
        if let Some(id) = task_id {
            self.active_task = Some(id.to_string());
        }

        let previous = match self.state {
            TimerState::Paused => self.session_id.take(),
            _ => None,
        };
        let task = self.active_task.as_deref();
        let opened = match previous.as_deref() {
            Some(prev) => self
                .recorder
                .resume(prev, self.interval_type, self.total_secs, task),
            None => self.recorder.open(self.interval_type, self.total_secs, task),
        };
        match opened {
            Ok(session) => {
                self.session_id = Some(session.id.clone());
                out.session = Some(session);
            }
            Err(e) => {
                self.session_id = None;
                out.warn(Operation::OpenSession, e);
            }
        }

        self.state = TimerState::Running;
        tracing::debug!(
            interval = %self.interval_type,
            remaining_secs = self.time_left,
            "timer running"
        );
        out.push(Event::TimerStarted {
            interval_type: self.interval_type,
            remaining_secs: self.time_left,
            session_id: self.session_id.clone(),
            task_id: self.active_task.clone(),
            at: Utc::now(),
        });
        out
    }

    /// Stop the countdown. The open session stays open.
    pub fn pause(&mut self) -> Outcome {
        let mut out = Outcome::default();
        if self.state != TimerState::Running {
            return out;
        }
        self.state = TimerState::Paused;
        tracing::debug!(remaining_secs = self.time_left, "timer paused");
        out.push(Event::TimerPaused {
            remaining_secs: self.time_left,
            at: Utc::now(),
        });
        out
    }

    /// Back to a full, idle interval of the current type.
    ///
    /// Cancels the open session and any pending auto-advance.
    pub fn reset(&mut self) -> Outcome {
        let mut out = Outcome::default();
        self.cancel_pending(&mut out);
        if let Some(id) = self.session_id.take() {
            if let Err(e) = self.recorder.cancel(&id) {
                out.warn(Operation::CancelSession, e);
            }
        }
        self.state = TimerState::Idle;
        self.load_interval(self.interval_type, &mut out);
        out.push(Event::TimerReset {
            interval_type: self.interval_type,
            remaining_secs: self.time_left,
            at: Utc::now(),
        });
        out
    }

    /// Change the interval type. Anything in flight is reset first so the
    /// countdown always matches the selected type.
    pub fn switch_interval_type(&mut self, interval: IntervalType) -> Outcome {
        let mut out = Outcome::default();
        if self.state != TimerState::Idle {
            out.merge(self.reset());
        } else {
            self.cancel_pending(&mut out);
        }
        let from = self.interval_type;
        self.interval_type = interval;
        self.load_interval(interval, &mut out);
        out.push(Event::IntervalSwitched {
            from,
            to: interval,
            remaining_secs: self.time_left,
            at: Utc::now(),
        });
        out
    }

    /// Advance the clock by one second.
    ///
    /// Only a running timer counts down, so extra or coalesced ticks after
    /// expiry are harmless. An idle engine with a pending auto-advance
    /// counts down its delay instead.
    pub fn tick(&mut self) -> Outcome {
        let mut out = Outcome::default();
        match self.state {
            TimerState::Running => {
                self.time_left = self.time_left.saturating_sub(1);
                if self.time_left == 0 {
                    self.state = TimerState::Idle;
                    self.complete(&mut out);
                }
            }
            TimerState::Idle => {
                let due = match self.pending.as_mut() {
                    Some(pending) => {
                        pending.delay_remaining_secs = pending.delay_remaining_secs.saturating_sub(1);
                        pending.delay_remaining_secs == 0
                    }
                    None => false,
                };
                if due {
                    self.fire_pending(&mut out);
                }
            }
            TimerState::Paused => {}
        }
        out
    }

    /// Cancel an active session left behind by an earlier run.
    pub fn recover(&mut self) -> Outcome {
        let mut out = Outcome::default();
        match self.recorder.active() {
            Ok(Some(stale)) if self.session_id.as_deref() != Some(stale.id.as_str()) => {
                match self.recorder.cancel(&stale.id) {
                    Ok(()) => {
                        tracing::info!(session_id = %stale.id, "canceled stale active session");
                        out.push(Event::SessionRecovered {
                            session_id: stale.id,
                            at: Utc::now(),
                        });
                    }
                    Err(e) => out.warn(Operation::RecoverSession, e),
                }
            }
            Ok(_) => {}
            Err(e) => out.warn(Operation::RecoverSession, e),
        }
        out
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// The fixed completion sequence. Runs once per natural expiry.
    fn complete(&mut self, out: &mut Outcome) {
        let finished = self.interval_type;
        let session_id = self.session_id.take();
        let task_id = self.active_task.clone();

        match session_id.as_deref() {
            Some(id) => {
                if let Err(e) = self.recorder.complete(id) {
                    out.warn(Operation::CompleteSession, e);
                }
            }
            None => tracing::debug!("interval finished without a recorded session"),
        }

        match finished {
            IntervalType::Work => {
                self.work_streak = self.work_streak.saturating_add(1);
                if let Some(id) = task_id.as_deref() {
                    if let Err(e) = self.tasks.increment_completed(id) {
                        out.warn(Operation::IncrementTask, e);
                    }
                }
            }
            IntervalType::LongBreak => self.work_streak = 0,
            IntervalType::ShortBreak => {}
        }

        self.notifier
            .interval_completed(finished, finished.completion_message_key());
        tracing::info!(interval = %finished, "interval completed");
        out.push(Event::TimerCompleted {
            interval_type: finished,
            session_id: session_id.clone(),
            task_id: task_id.clone(),
            at: Utc::now(),
        });

        let settings = self.current_settings(out);
        let Some(next) = self.next_interval(finished, &settings) else {
            return;
        };

        self.interval_type = next;
        self.time_left = settings.duration_secs(next);
        self.total_secs = self.time_left;
        let delay = self.options.auto_advance_delay_secs;
        self.pending = Some(PendingContinuation {
            after_session: session_id.clone(),
            next,
            task_id,
            delay_remaining_secs: delay,
        });
        out.push(Event::AutoAdvanceScheduled {
            next,
            delay_secs: delay,
            after_session: session_id,
            at: Utc::now(),
        });
        if delay == 0 {
            self.fire_pending(out);
        }
    }

    fn next_interval(&self, finished: IntervalType, settings: &Settings) -> Option<IntervalType> {
        match finished {
            IntervalType::Work if settings.auto_start_breaks => {
                let every = settings.long_break_interval;
                if every > 0 && self.work_streak % every == 0 {
                    Some(IntervalType::LongBreak)
                } else {
                    Some(IntervalType::ShortBreak)
                }
            }
            IntervalType::ShortBreak | IntervalType::LongBreak if settings.auto_start_pomodoros => {
                Some(IntervalType::Work)
            }
            _ => None,
        }
    }

    fn fire_pending(&mut self, out: &mut Outcome) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        tracing::debug!(
            next = %pending.next,
            after_session = ?pending.after_session,
            "auto-advancing"
        );
        self.interval_type = pending.next;
        if let Some(task) = pending.task_id {
            self.active_task = Some(task);
        }
        let task = self.active_task.clone();
        out.merge(self.resume_or_start(task.as_deref()));
    }

    fn cancel_pending(&mut self, out: &mut Outcome) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(next = %pending.next, "auto-advance canceled");
            out.push(Event::AutoAdvanceCanceled {
                next: pending.next,
                at: Utc::now(),
            });
        }
    }

    fn current_settings(&self, out: &mut Outcome) -> Settings {
        match self.settings.get() {
            Ok(settings) => settings,
            Err(e) => {
                out.warn(Operation::LoadSettings, e);
                self.settings.cached_or_default()
            }
        }
    }

    /// Load a full countdown for `interval` from settings.
    fn load_interval(&mut self, interval: IntervalType, out: &mut Outcome) {
        self.total_secs = self.current_settings(out).duration_secs(interval);
        self.time_left = self.total_secs;
    }
}
