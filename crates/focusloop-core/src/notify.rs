use crate::timer::IntervalType;

/// Receives one call per completed interval.
///
/// Implementations play sounds, show alerts, or log. They never take part in
/// timer state transitions.
pub trait Notifier: Send + Sync {
    fn interval_completed(&self, interval: IntervalType, message_key: &str);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn interval_completed(&self, interval: IntervalType, message_key: &str) {
        tracing::info!(%interval, message_key, "interval completed");
    }
}
