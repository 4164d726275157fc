//! Async clock for [`TimerEngine`].

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::TimerEngine;
use crate::events::Outcome;

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// Nothing left to count down.
    Idle,
    /// The shutdown future resolved first.
    Shutdown,
}

/// Tick `engine` once per `period` until it goes idle or `shutdown` resolves.
///
/// Late ticks are delivered in a burst; the engine ignores ticks outside
/// `running`, so catching up after a stall never completes an interval twice.
/// Every non-empty outcome is handed to `on_outcome`.
///
/// The engine's store calls (closing the session, bumping the task counter,
/// opening the next session) and `on_outcome` run inline in the tick branch.
/// A slow store therefore delays the countdown, and the missed ticks arrive
/// together once it returns. Shutdown is only observed between ticks. This is
/// fine for the local SQLite store; a remote store would need its writes
/// moved off this task.
pub async fn run<S, F>(
    engine: &mut TimerEngine,
    period: Duration,
    shutdown: S,
    mut on_outcome: F,
) -> DriverExit
where
    S: Future<Output = ()>,
    F: FnMut(&TimerEngine, Outcome),
{
    let mut clock = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    clock.set_missed_tick_behavior(MissedTickBehavior::Burst);
    tokio::pin!(shutdown);

    loop {
        if !engine.needs_ticks() {
            tracing::debug!("timer driver stopped: idle");
            return DriverExit::Idle;
        }
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("timer driver stopped: shutdown");
                return DriverExit::Shutdown;
            }
            _ = clock.tick() => {
                let outcome = engine.tick();
                if !outcome.is_empty() {
                    on_outcome(engine, outcome);
                }
            }
        }
    }
}
