//! Core task state engine for Taskify.
//! This crate is the single source of truth for task invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod reminder;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Category, Task, TaskDraft, TaskId, TaskPatch, UnknownCategory};
pub use query::{
    classify_due, filter_tasks, progress, CategoryFilter, DueState, InvalidFilter, Progress,
    StatusFilter,
};
pub use reminder::{
    DeliveryError, LogSink, ReminderNotice, ReminderScheduler, ReminderSink, SchedulerHandle,
};
pub use repo::task_slot::{
    MemorySlotRepository, SlotError, SlotResult, SqliteSlotRepository, TaskSlotRepository,
    DEFAULT_SLOT_KEY,
};
pub use service::task_store::{DeclineReason, MutationOutcome, SharedTaskStore, TaskStore};

/// Opens the SQLite-backed store described by `config`.
///
/// # Errors
/// - Database open/migration failure.
pub fn open_store(config: &EngineConfig) -> SlotResult<TaskStore<SqliteSlotRepository>> {
    let conn = db::open_db(&config.db_path)?;
    let repo = SqliteSlotRepository::try_new(conn, config.slot_key.clone())?;
    Ok(TaskStore::open(repo))
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
