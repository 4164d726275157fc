use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three kinds of interval the timer alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalType {
    Work,
    ShortBreak,
    LongBreak,
}

impl IntervalType {
    pub const ALL: [IntervalType; 3] = [
        IntervalType::Work,
        IntervalType::ShortBreak,
        IntervalType::LongBreak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalType::Work => "work",
            IntervalType::ShortBreak => "short_break",
            IntervalType::LongBreak => "long_break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, IntervalType::Work)
    }

    /// Message key handed to the notifier when an interval of this type ends.
    pub fn completion_message_key(&self) -> &'static str {
        match self {
            IntervalType::Work => "timer.work_complete",
            IntervalType::ShortBreak => "timer.short_break_complete",
            IntervalType::LongBreak => "timer.long_break_complete",
        }
    }
}

impl Default for IntervalType {
    fn default() -> Self {
        IntervalType::Work
    }
}

impl fmt::Display for IntervalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" | "pomodoro" => Ok(IntervalType::Work),
            "short_break" | "short-break" => Ok(IntervalType::ShortBreak),
            "long_break" | "long-break" => Ok(IntervalType::LongBreak),
            other => Err(format!("unknown interval type: {other}")),
        }
    }
}
