//! # focusloop Core Library
//!
//! This library provides the core logic for the focusloop Pomodoro timer.
//! Every operation is available through the `focusloop` CLI binary, which is
//! a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A tick-driven state machine; the caller invokes
//!   `tick()` once per second (see [`timer::driver`] for an async clock)
//! - **Stores**: Task, project, settings and session handles over a shared
//!   persistence port
//! - **Storage**: SQLite and in-memory implementations of [`Store`], plus
//!   TOML-based local configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TaskStore`]: Active and archived task lists
//! - [`SessionRecorder`]: One durable record per started interval
//! - [`StatsAggregator`]: Statistics derived from the session history
//! - [`Database`]: SQLite persistence
//! - [`AppConfig`]: Application configuration management

pub mod error;
pub mod events;
pub mod notify;
pub mod project;
pub mod session;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, Result, StoreError, ValidationError};
pub use events::{Event, Operation, Outcome, TimerSnapshot, Warning};
pub use notify::{LogNotifier, Notifier};
pub use project::{Project, ProjectPatch, ProjectStore};
pub use session::{Session, SessionRecorder, SessionStatus};
pub use settings::{Settings, SettingsPatch, SettingsStore};
pub use stats::{Stats, StatsAggregator};
pub use storage::{AppConfig, Database, MemoryStore, Store};
pub use task::{Task, TaskPatch, TaskStore};
pub use timer::{EngineOptions, IntervalType, PendingContinuation, TimerEngine, TimerState};
