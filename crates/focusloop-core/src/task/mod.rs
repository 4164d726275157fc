//! Task model and the [`TaskStore`] that owns the active/archived lists.
//!
//! A task carries an advisory estimate of how many work intervals it needs
//! and a counter of how many it actually got. The counter only moves up
//! through a completed work interval bound to the task; an explicit edit
//! is the only way to lower it.

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub use store::TaskStore;

/// Smallest estimate a user may set.
pub const ESTIMATE_MIN: u32 = 1;
/// Largest estimate a user may set.
pub const ESTIMATE_MAX: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Weak reference; may point at a deactivated project.
    #[serde(default)]
    pub project_id: Option<String>,
    pub estimated_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub completed: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a new, validated, active task.
    pub fn new(
        title: &str,
        estimated_pomodoros: u32,
        project_id: Option<String>,
        description: Option<String>,
    ) -> Result<Self, ValidationError> {
        let title = validate_title(title)?;
        validate_estimate(estimated_pomodoros)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: normalize_text(description),
            project_id: normalize_text(project_id),
            estimated_pomodoros,
            completed_pomodoros: 0,
            completed: false,
            archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Work intervals still expected before the estimate is met.
    pub fn remaining_pomodoros(&self) -> u32 {
        self.estimated_pomodoros
            .saturating_sub(self.completed_pomodoros)
    }

    /// Apply a partial edit. Validation happens before anything is changed.
    pub fn apply(&mut self, patch: &TaskPatch) -> Result<(), ValidationError> {
        let title = match &patch.title {
            Some(t) => Some(validate_title(t)?),
            None => None,
        };
        if let Some(estimate) = patch.estimated_pomodoros {
            validate_estimate(estimate)?;
        }
        if let Some(done) = patch.completed_pomodoros {
            if done > self.completed_pomodoros {
                return Err(ValidationError::OutOfRange {
                    field: "completed_pomodoros",
                    value: i64::from(done),
                    min: 0,
                    max: i64::from(self.completed_pomodoros),
                });
            }
        }

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = &patch.description {
            self.description = normalize_text(description.clone());
        }
        if let Some(project_id) = &patch.project_id {
            self.project_id = normalize_text(project_id.clone());
        }
        if let Some(estimate) = patch.estimated_pomodoros {
            self.estimated_pomodoros = estimate;
        }
        if let Some(done) = patch.completed_pomodoros {
            self.completed_pomodoros = done;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update for a task.
///
/// Nested options distinguish "leave alone" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub project_id: Option<Option<String>>,
    #[serde(default)]
    pub estimated_pomodoros: Option<u32>,
    /// Explicit edit of the counter. May only lower it; raising it takes a
    /// completed work interval.
    #[serde(default)]
    pub completed_pomodoros: Option<u32>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &TaskPatch::default()
    }
}

pub(crate) fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field: "title" });
    }
    Ok(trimmed.to_string())
}

fn validate_estimate(estimate: u32) -> Result<(), ValidationError> {
    if !(ESTIMATE_MIN..=ESTIMATE_MAX).contains(&estimate) {
        return Err(ValidationError::OutOfRange {
            field: "estimated_pomodoros",
            value: i64::from(estimate),
            min: i64::from(ESTIMATE_MIN),
            max: i64::from(ESTIMATE_MAX),
        });
    }
    Ok(())
}

/// Blank optional text is stored as `None`.
pub(crate) fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_active_with_zero_progress() {
        let task = Task::new("  Write report ", 4, None, Some(" ".into())).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.completed_pomodoros, 0);
        assert_eq!(task.remaining_pomodoros(), 4);
        assert!(!task.completed);
        assert!(!task.archived);
        assert_eq!(task.description, None);
    }

    #[test]
    fn rejects_blank_title_and_bad_estimate() {
        assert_eq!(
            Task::new("   ", 1, None, None),
            Err(ValidationError::Empty { field: "title" })
        );
        assert!(Task::new("x", 0, None, None).is_err());
        assert!(Task::new("x", 11, None, None).is_err());
        assert!(Task::new("x", 10, None, None).is_ok());
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut task = Task::new("Plan", 2, None, None).unwrap();
        let patch = TaskPatch {
            title: Some("Replan".into()),
            estimated_pomodoros: Some(42),
            ..Default::default()
        };
        assert!(task.apply(&patch).is_err());
        assert_eq!(task.title, "Plan");
        assert_eq!(task.estimated_pomodoros, 2);
    }

    #[test]
    fn patch_can_clear_project_and_lower_counter() {
        let mut task = Task::new("Plan", 2, Some("p1".into()), None).unwrap();
        task.completed_pomodoros = 3;
        let patch = TaskPatch {
            project_id: Some(None),
            completed_pomodoros: Some(1),
            ..Default::default()
        };
        task.apply(&patch).unwrap();
        assert_eq!(task.project_id, None);
        assert_eq!(task.completed_pomodoros, 1);
        assert_eq!(task.remaining_pomodoros(), 1);
    }

    #[test]
    fn patch_cannot_raise_counter() {
        let mut task = Task::new("Plan", 2, None, None).unwrap();
        task.completed_pomodoros = 1;
        let patch = TaskPatch {
            title: Some("Renamed".into()),
            completed_pomodoros: Some(9),
            ..Default::default()
        };
        let err = task.apply(&patch).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "completed_pomodoros",
                value: 9,
                max: 1,
                ..
            }
        ));
        assert_eq!(task.completed_pomodoros, 1);
        assert_eq!(task.title, "Plan");

        task.apply(&TaskPatch {
            completed_pomodoros: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(task.completed_pomodoros, 1);
    }

    #[test]
    fn empty_patch_detected() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch {
            completed: Some(true),
            ..Default::default()
        }
        .is_empty());
    }
}
