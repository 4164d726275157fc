//! Foreground timer for the CLI.
//!
//! The engine lives only as long as `timer run`; the session record is what
//! survives. A later process cleans up an abandoned run with `recover()`.

use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use focusloop_core::timer::{driver, DriverExit};
use focusloop_core::{
    AppConfig, EngineOptions, IntervalType, Outcome, SessionRecorder, SettingsStore, TaskStore,
    TimerEngine, ValidationError,
};
use serde_json::json;

use super::{open_store, print_json, CmdResult};
use crate::notifier::TerminalNotifier;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run an interval in the foreground, printing events as JSON lines
    Run {
        /// Task to bind to work intervals
        #[arg(long)]
        task: Option<String>,
        /// Interval type: work, short_break or long_break
        #[arg(long = "type", default_value = "work")]
        interval: IntervalType,
    },
    /// Print the active session and configured durations as JSON
    Status,
    /// Cancel a session left active by an interrupted run
    Cancel,
}

fn emit(outcome: &Outcome) {
    for event in &outcome.events {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
        }
    }
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub fn run(action: TimerAction, config: &AppConfig) -> CmdResult {
    let store = open_store()?;
    let settings = SettingsStore::new(store.clone());
    let recorder = SessionRecorder::new(store.clone());
    let tasks = TaskStore::new(store.clone());

    match action {
        TimerAction::Run { task, interval } => {
            tasks.load()?;
            if let Some(id) = task.as_deref() {
                if tasks.get(id).is_none() {
                    return Err(ValidationError::NotFound {
                        kind: "task",
                        id: id.to_string(),
                    }
                    .into());
                }
            }

            let notifier = Arc::new(TerminalNotifier::new(&config.notifications));
            let mut engine = TimerEngine::new(settings, recorder, tasks, notifier).with_options(
                EngineOptions {
                    auto_advance_delay_secs: config.timer.auto_advance_delay_secs,
                },
            );

            emit(&engine.recover());
            if interval != engine.interval_type() {
                emit(&engine.switch_interval_type(interval));
            }
            emit(&engine.start(task.as_deref()));

            let period = Duration::from_millis(config.timer.tick_millis.max(1));
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let exit = runtime.block_on(driver::run(&mut engine, period, ctrl_c(), |_, outcome| {
                emit(&outcome)
            }));

            if exit == DriverExit::Shutdown {
                tracing::info!("interrupted, resetting timer");
                emit(&engine.reset());
            }
        }
        TimerAction::Status => {
            let current = settings.get()?;
            let active = recorder.active()?;
            print_json(&json!({
                "active_session": active,
                "settings": current,
                "durations_secs": {
                    "work": current.duration_secs(IntervalType::Work),
                    "short_break": current.duration_secs(IntervalType::ShortBreak),
                    "long_break": current.duration_secs(IntervalType::LongBreak),
                },
            }))?;
        }
        TimerAction::Cancel => {
            let canceled = match recorder.active()? {
                Some(session) => {
                    recorder.cancel(&session.id)?;
                    Some(session.id)
                }
                None => None,
            };
            print_json(&json!({ "canceled": canceled }))?;
        }
    }
    Ok(())
}
