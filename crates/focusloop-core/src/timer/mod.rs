pub mod driver;
mod engine;
mod interval;

pub use driver::DriverExit;
pub use engine::{EngineOptions, PendingContinuation, TimerEngine, TimerState};
pub use interval::IntervalType;
