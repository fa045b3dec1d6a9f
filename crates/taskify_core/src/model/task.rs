//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record persisted in the task slot.
//! - Define the input shapes (`TaskDraft`, `TaskPatch`) accepted by the store.
//! - Own the due-time arithmetic shared by reminders and due-state display.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `name` is non-empty after trimming.
//! - `created_at` is written once at creation.
//! - `reminded` only flips to `true` through the reminder path.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Fixed category set used for grouping and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    Personal,
    Study,
    Health,
    Other,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Study,
        Category::Health,
        Category::Other,
    ];

    /// Wire/display label, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Study => "Study",
            Self::Health => "Health",
            Self::Other => "Other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category label is not part of the closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown category `{}`; expected Work|Personal|Study|Health|Other",
            self.0
        )
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Parses a category label case-insensitively.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(trimmed.to_string()))
    }
}

/// Canonical task record.
///
/// Field names are serialized in camelCase so the persisted slot keeps the
/// `dueDate`/`reminderMinutesBefore`/`createdAt` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub completed: bool,
    pub category: Category,
    /// Absolute due instant. `None` means unscheduled.
    pub due_date: Option<DateTime<Utc>>,
    /// Reminder offset before `due_date`. Ignored when `due_date` is `None`.
    pub reminder_minutes_before: Option<u32>,
    pub reminded: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Builds a fresh task from a draft.
    ///
    /// Returns `None` when the draft name is blank after trimming.
    pub fn from_draft(draft: TaskDraft, created_at: DateTime<Utc>) -> Option<Self> {
        let name = normalize_name(&draft.name)?;
        Some(Self {
            id: Uuid::new_v4(),
            name,
            completed: false,
            category: draft.category,
            due_date: draft.due_date,
            reminder_minutes_before: draft.reminder_minutes_before,
            reminded: false,
            created_at,
        })
    }

    /// Instant at which the reminder window opens.
    ///
    /// `None` unless both `due_date` and `reminder_minutes_before` are set.
    /// A window that would start before the earliest representable instant
    /// opens at that instant.
    pub fn reminder_time(&self) -> Option<DateTime<Utc>> {
        let due = self.due_date?;
        let minutes = self.reminder_minutes_before?;
        let opens_at = Duration::try_minutes(i64::from(minutes))
            .and_then(|offset| due.checked_sub_signed(offset))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Some(opens_at)
    }

    /// Fractional hours between `now` and `due_date`; negative once past due.
    pub fn hours_until_due(&self, now: DateTime<Utc>) -> Option<f64> {
        let due = self.due_date?;
        let millis = (due - now).num_milliseconds();
        Some(millis as f64 / MILLIS_PER_HOUR)
    }

    /// Whether the scheduler should fire this task's reminder at `now`.
    pub fn reminder_due(&self, now: DateTime<Utc>) -> bool {
        if self.reminded || self.completed {
            return false;
        }
        self.reminder_time().is_some_and(|at| now >= at)
    }
}

const MILLIS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub category: Category,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_minutes_before: Option<u32>,
}

impl TaskDraft {
    /// Unscheduled draft with the given name and category.
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            due_date: None,
            reminder_minutes_before: None,
        }
    }

    pub fn due_at(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn remind_before(mut self, minutes: u32) -> Self {
        self.reminder_minutes_before = Some(minutes);
        self
    }
}

/// Shallow field overwrite applied by `TaskStore::update`.
///
/// Outer `None` leaves a field untouched. For the optional schedule fields,
/// `Some(None)` clears the value. Patches never touch `reminded`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<Category>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub reminder_minutes_before: Option<Option<u32>>,
}

impl TaskPatch {
    /// Whether applying this patch edits the reminder schedule.
    pub fn touches_schedule(&self) -> bool {
        self.due_date.is_some() || self.reminder_minutes_before.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Trims a task name, returning `None` for blank input.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
