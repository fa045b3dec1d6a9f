//! Due-state classification for display layers.

use crate::model::task::Task;
use chrono::{DateTime, Utc};

/// Hours ahead of the due instant that still count as "due soon".
pub const DUE_SOON_HOURS: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Overdue,
    DueSoon,
    Normal,
}

impl DueState {
    /// Stable label used by UI styling (`overdue|due-soon|normal`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::DueSoon => "due-soon",
            Self::Normal => "normal",
        }
    }
}

/// Classifies `task` relative to `now`.
///
/// Completed and unscheduled tasks are always `Normal`.
pub fn classify_due(task: &Task, now: DateTime<Utc>) -> DueState {
    if task.completed {
        return DueState::Normal;
    }
    match task.hours_until_due(now) {
        Some(hours) if hours < 0.0 => DueState::Overdue,
        Some(hours) if hours <= DUE_SOON_HOURS => DueState::DueSoon,
        _ => DueState::Normal,
    }
}
