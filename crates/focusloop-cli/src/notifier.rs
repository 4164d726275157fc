use std::io::Write;

use focusloop_core::storage::NotificationsConfig;
use focusloop_core::{IntervalType, Notifier};

/// Writes a short completion line to stderr, optionally ringing the bell.
pub struct TerminalNotifier {
    enabled: bool,
    bell: bool,
}

impl TerminalNotifier {
    pub fn new(config: &NotificationsConfig) -> Self {
        Self {
            enabled: config.enabled,
            bell: config.bell,
        }
    }
}

fn message(message_key: &str) -> &str {
    match message_key {
        "timer.work_complete" => "Work interval complete. Time for a break.",
        "timer.short_break_complete" => "Short break over. Back to work.",
        "timer.long_break_complete" => "Long break over. Back to work.",
        other => other,
    }
}

impl Notifier for TerminalNotifier {
    fn interval_completed(&self, interval: IntervalType, message_key: &str) {
        tracing::debug!(%interval, message_key, "notifying");
        if !self.enabled {
            return;
        }
        let mut err = std::io::stderr().lock();
        let bell = if self.bell { "\x07" } else { "" };
        let _ = writeln!(err, "{bell}{}", message(message_key));
    }
}
