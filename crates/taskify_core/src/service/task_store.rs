//! Task store: sole owner and mutator of the task collection.
//!
//! # Responsibility
//! - Hold the authoritative ordered collection in memory.
//! - Expose add/toggle/delete/update/reorder with silent-decline semantics.
//! - Persist the whole collection through the slot repository after every
//!   applied mutation.
//!
//! # Invariants
//! - Ids are unique within the collection.
//! - Editing `due_date` or `reminder_minutes_before` resets `reminded`.
//! - Only `mark_reminded` sets `reminded = true`.
//! - `reorder` preserves length and the id set.

use crate::clock::{Clock, SystemClock};
use crate::model::task::{normalize_name, Task, TaskDraft, TaskId, TaskPatch};
use crate::repo::task_slot::TaskSlotRepository;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Store handle shared between callers and the reminder scheduler.
pub type SharedTaskStore<R> = Arc<Mutex<TaskStore<R>>>;

/// Why a mutation left the collection unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Input violates a field constraint (blank name).
    InvalidInput,
    /// No task carries the requested id.
    NotFound,
    /// Reorder onto the same slot.
    NoOpMove,
}

impl DeclineReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::NoOpMove => "noop_move",
        }
    }
}

impl Display for DeclineReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a store mutation. Declines are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    Declined(DeclineReason),
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Owned task collection bound to one slot repository.
pub struct TaskStore<R: TaskSlotRepository> {
    tasks: Vec<Task>,
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: TaskSlotRepository> TaskStore<R> {
    /// Loads the collection from `repo` using wall-clock time.
    pub fn open(repo: R) -> Self {
        Self::open_with_clock(repo, Arc::new(SystemClock))
    }

    /// Loads the collection from `repo` using the provided clock.
    ///
    /// Duplicate ids in persisted state keep their first occurrence.
    pub fn open_with_clock(repo: R, clock: Arc<dyn Clock>) -> Self {
        let loaded = repo.load();
        let loaded_count = loaded.len();
        let mut seen = HashSet::with_capacity(loaded_count);
        let tasks = loaded
            .into_iter()
            .filter(|task| seen.insert(task.id))
            .collect::<Vec<_>>();
        if tasks.len() != loaded_count {
            warn!(
                "event=store_open module=store status=recovered reason=duplicate_ids dropped={}",
                loaded_count - tasks.len()
            );
        }
        info!(
            "event=store_open module=store status=ok count={}",
            tasks.len()
        );

        Self { tasks, repo, clock }
    }

    /// Wraps the store for sharing with the reminder scheduler.
    pub fn into_shared(self) -> SharedTaskStore<R> {
        Arc::new(Mutex::new(self))
    }

    /// Current collection in display order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Owned copy of the current collection.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Appends a new task built from `draft`.
    ///
    /// Returns the new id, or `None` when the name is blank.
    pub fn add(&mut self, draft: TaskDraft) -> Option<TaskId> {
        let Some(mut task) = Task::from_draft(draft, self.clock.now()) else {
            self.log_declined("task_add", None, DeclineReason::InvalidInput);
            return None;
        };
        while self.position(task.id).is_some() {
            task.id = TaskId::new_v4();
        }

        let id = task.id;
        self.tasks.push(task);
        self.persist("task_add", Some(id));
        Some(id)
    }

    /// Flips `completed` on the matching task.
    pub fn toggle_complete(&mut self, id: TaskId) -> MutationOutcome {
        let Some(index) = self.position(id) else {
            return self.decline("task_toggle", Some(id), DeclineReason::NotFound);
        };
        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        self.persist("task_toggle", Some(id));
        MutationOutcome::Applied
    }

    /// Removes the matching task, keeping the order of the rest.
    pub fn delete(&mut self, id: TaskId) -> MutationOutcome {
        let Some(index) = self.position(id) else {
            return self.decline("task_delete", Some(id), DeclineReason::NotFound);
        };
        self.tasks.remove(index);
        self.persist("task_delete", Some(id));
        MutationOutcome::Applied
    }

    /// Overwrites the fields present in `patch`.
    ///
    /// A patch that touches either schedule field resets `reminded`, even if
    /// the new value equals the old one. A patch whose name is blank after
    /// trimming is declined as a whole.
    pub fn update(&mut self, id: TaskId, patch: TaskPatch) -> MutationOutcome {
        let Some(index) = self.position(id) else {
            return self.decline("task_update", Some(id), DeclineReason::NotFound);
        };
        let name = match patch.name.as_deref() {
            Some(raw) => match normalize_name(raw) {
                Some(name) => Some(name),
                None => {
                    return self.decline("task_update", Some(id), DeclineReason::InvalidInput)
                }
            },
            None => None,
        };

        let resets_reminder = patch.touches_schedule();
        let task = &mut self.tasks[index];
        if let Some(name) = name {
            task.name = name;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(minutes) = patch.reminder_minutes_before {
            task.reminder_minutes_before = minutes;
        }
        if resets_reminder {
            task.reminded = false;
        }

        self.persist("task_update", Some(id));
        MutationOutcome::Applied
    }

    /// Moves `source_id` into the index currently held by `target_id`.
    ///
    /// Elements between the two positions shift by one toward the vacated
    /// slot.
    pub fn reorder(&mut self, source_id: TaskId, target_id: TaskId) -> MutationOutcome {
        let (Some(from), Some(to)) = (self.position(source_id), self.position(target_id)) else {
            return self.decline("task_reorder", Some(source_id), DeclineReason::NotFound);
        };
        if from == to {
            return self.decline("task_reorder", Some(source_id), DeclineReason::NoOpMove);
        }

        let moved = self.tasks.remove(from);
        self.tasks.insert(to, moved);
        self.persist("task_reorder", Some(source_id));
        MutationOutcome::Applied
    }

    /// Sets `reminded = true`. Reserved for the reminder scheduler.
    pub(crate) fn mark_reminded(&mut self, id: TaskId) -> MutationOutcome {
        let Some(index) = self.position(id) else {
            return self.decline("task_mark_reminded", Some(id), DeclineReason::NotFound);
        };
        self.tasks[index].reminded = true;
        self.persist("task_mark_reminded", Some(id));
        MutationOutcome::Applied
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn decline(
        &self,
        event: &str,
        id: Option<TaskId>,
        reason: DeclineReason,
    ) -> MutationOutcome {
        self.log_declined(event, id, reason);
        MutationOutcome::Declined(reason)
    }

    fn log_declined(&self, event: &str, id: Option<TaskId>, reason: DeclineReason) {
        match id {
            Some(id) => debug!(
                "event={event} module=store status=skipped task_id={id} reason={reason}"
            ),
            None => debug!("event={event} module=store status=skipped reason={reason}"),
        }
    }

    // A failed save leaves memory authoritative; the next save rewrites the
    // whole slot.
    fn persist(&self, event: &str, id: Option<TaskId>) {
        let task_id = id.map(|id| id.to_string()).unwrap_or_default();
        match self.repo.save(&self.tasks) {
            Ok(()) => debug!(
                "event={event} module=store status=ok task_id={task_id} count={}",
                self.tasks.len()
            ),
            Err(err) => error!(
                "event={event} module=store status=error task_id={task_id} error_code=slot_save_failed error={err}"
            ),
        }
    }
}
