//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose task store, query, and reminder operations to Dart via FRB.
//! - Own the process-wide engine: store handle, reminder runtime, and the
//!   queue of fired reminders polled by the UI.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Timestamps cross the boundary as epoch milliseconds (UTC).
//! - Ids cross the boundary as hyphenated UUID strings.

use chrono::{DateTime, Utc};
use log::{info, warn};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use taskify_core::{
    classify_due, core_version as core_version_inner, filter_tasks,
    init_logging as init_logging_inner, open_store, progress, Category, CategoryFilter, Clock,
    EngineConfig, MutationOutcome, ReminderNotice, ReminderScheduler, SchedulerHandle,
    SharedTaskStore, SqliteSlotRepository, StatusFilter, SystemClock, Task, TaskDraft, TaskId,
    TaskPatch,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

static ENGINE: OnceCell<Engine> = OnceCell::new();

struct Engine {
    config: EngineConfig,
    store: SharedTaskStore<SqliteSlotRepository>,
    runtime: Runtime,
    scheduler: Mutex<Option<SchedulerHandle>>,
    notice_tx: mpsc::UnboundedSender<ReminderNotice>,
    notice_rx: Mutex<mpsc::UnboundedReceiver<ReminderNotice>>,
}

fn engine() -> Result<&'static Engine, String> {
    ENGINE.get_or_try_init(|| {
        let config = engine_config()?;
        let store = open_store(&config)
            .map_err(|err| format!("task store open failed: {err}"))?
            .into_shared();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("taskify-reminders")
            .enable_time()
            .build()
            .map_err(|err| format!("reminder runtime init failed: {err}"))?;
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        info!(
            "event=ffi_engine_init module=ffi status=ok db_path={}",
            config.db_path.display()
        );
        Ok(Engine {
            config,
            store,
            runtime,
            scheduler: Mutex::new(None),
            notice_tx,
            notice_rx: Mutex::new(notice_rx),
        })
    })
}

#[cfg(not(test))]
fn engine_config() -> Result<EngineConfig, String> {
    EngineConfig::from_env().map_err(|err| err.to_string())
}

// Unit tests share one engine per process; give each run its own database.
#[cfg(test)]
fn engine_config() -> Result<EngineConfig, String> {
    let run_id = TaskId::new_v4();
    Ok(EngineConfig {
        db_path: std::env::temp_dir().join(format!("taskify-ffi-test-{run_id}.sqlite3")),
        ..EngineConfig::default()
    })
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Task projection for list rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub name: String,
    pub completed: bool,
    /// `Work|Personal|Study|Health|Other`.
    pub category: String,
    pub due_epoch_ms: Option<i64>,
    pub reminder_minutes_before: Option<u32>,
    pub reminded: bool,
    pub created_epoch_ms: i64,
    /// `overdue|due-soon|normal`, evaluated at call time.
    pub due_state: String,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Completion progress envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressResponse {
    pub completed_count: u32,
    pub total: u32,
    pub percent: u8,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether the operation changed state.
    pub ok: bool,
    /// Affected task id, when one exists.
    pub task_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task_id: Option<TaskId>) -> Self {
        Self {
            ok: true,
            task_id: task_id.map(|id| id.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task_id: None,
            message: message.into(),
        }
    }

    fn from_outcome(op: &str, id: TaskId, outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Applied => Self::success(format!("{op} applied."), Some(id)),
            MutationOutcome::Declined(reason) => Self::failure(format!("{op} declined: {reason}")),
        }
    }
}

/// Field edits for `task_update`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdateInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub completed: Option<bool>,
    pub due_epoch_ms: Option<i64>,
    /// Clears the due date; wins over `due_epoch_ms`.
    pub clear_due: bool,
    pub reminder_minutes_before: Option<u32>,
    /// Clears the reminder offset; wins over `reminder_minutes_before`.
    pub clear_reminder: bool,
}

/// One fired reminder, as polled by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderItem {
    pub task_id: String,
    pub task_name: String,
    pub due_epoch_ms: i64,
    /// Ready-to-show text.
    pub message: String,
}

/// Lists the whole collection in display order.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list() -> TaskListResponse {
    tasks_filter("all".to_string(), "all".to_string())
}

/// Lists tasks passing both filters, in display order.
///
/// Input semantics:
/// - `status`: `all|active|done`.
/// - `category`: `all` or a category label (case-insensitive).
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_filter(status: String, category: String) -> TaskListResponse {
    let filters = status
        .parse::<StatusFilter>()
        .and_then(|status| Ok((status, category.parse::<CategoryFilter>()?)));
    let (status, category) = match filters {
        Ok(filters) => filters,
        Err(err) => return list_failure(format!("tasks_filter failed: {err}")),
    };
    let engine = match engine() {
        Ok(engine) => engine,
        Err(err) => return list_failure(format!("tasks_filter failed: {err}")),
    };

    let now = SystemClock.now();
    let store = engine.store.lock();
    let items = filter_tasks(store.tasks(), status, category)
        .into_iter()
        .map(|task| to_task_item(task, now))
        .collect::<Vec<_>>();
    let message = if items.is_empty() {
        "No tasks.".to_string()
    } else {
        format!("Found {} task(s).", items.len())
    };
    TaskListResponse {
        ok: true,
        items,
        message,
    }
}

/// Completion progress over the whole collection.
///
/// Returns zeros when the engine cannot be opened.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_progress() -> ProgressResponse {
    let Ok(engine) = engine() else {
        return ProgressResponse {
            completed_count: 0,
            total: 0,
            percent: 0,
        };
    };
    let metrics = progress(engine.store.lock().tasks());
    ProgressResponse {
        completed_count: u32::try_from(metrics.completed_count).unwrap_or(u32::MAX),
        total: u32::try_from(metrics.total).unwrap_or(u32::MAX),
        percent: metrics.percent,
    }
}

/// Creates a task at the end of the list.
///
/// # FFI contract
/// - Blank names are declined with `ok=false`.
/// - Returns created task id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn task_add(
    name: String,
    category: String,
    due_epoch_ms: Option<i64>,
    reminder_minutes_before: Option<u32>,
) -> TaskActionResponse {
    let category = match category.parse::<Category>() {
        Ok(category) => category,
        Err(err) => return TaskActionResponse::failure(format!("task_add failed: {err}")),
    };
    let due_date = match due_epoch_ms.map(epoch_ms_to_utc).transpose() {
        Ok(due_date) => due_date,
        Err(err) => return TaskActionResponse::failure(format!("task_add failed: {err}")),
    };
    let draft = TaskDraft {
        name,
        category,
        due_date,
        reminder_minutes_before,
    };

    with_store("task_add", |store| match store.add(draft) {
        Some(id) => TaskActionResponse::success("Task created.", Some(id)),
        None => TaskActionResponse::failure("task_add declined: invalid_input"),
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle_complete(id: String) -> TaskActionResponse {
    with_task_id("task_toggle_complete", &id, |store, id| {
        store.toggle_complete(id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: String) -> TaskActionResponse {
    with_task_id("task_delete", &id, |store, id| store.delete(id))
}

/// Applies field edits. Editing due date or reminder offset re-arms the
/// reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(id: String, input: TaskUpdateInput) -> TaskActionResponse {
    let patch = match to_patch(input) {
        Ok(patch) => patch,
        Err(err) => return TaskActionResponse::failure(format!("task_update failed: {err}")),
    };
    with_task_id("task_update", &id, move |store, id| store.update(id, patch))
}

/// Moves `source_id` into the position held by `target_id`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_reorder(source_id: String, target_id: String) -> TaskActionResponse {
    let target = match parse_task_id(&target_id) {
        Ok(target) => target,
        Err(err) => return TaskActionResponse::failure(format!("task_reorder failed: {err}")),
    };
    with_task_id("task_reorder", &source_id, |store, source| {
        store.reorder(source, target)
    })
}

/// Starts the reminder loop. Restarts it when already running.
///
/// `interval_ms = None` uses the configured interval.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_start(interval_ms: Option<u64>) -> TaskActionResponse {
    let engine = match engine() {
        Ok(engine) => engine,
        Err(err) => return TaskActionResponse::failure(format!("reminders_start failed: {err}")),
    };
    let interval = match interval_ms {
        Some(0) => {
            return TaskActionResponse::failure("reminders_start failed: interval_ms must be > 0")
        }
        Some(ms) => Duration::from_millis(ms),
        None => engine.config.reminder_interval,
    };

    let mut slot = engine.scheduler.lock();
    if let Some(previous) = slot.take() {
        engine.runtime.block_on(previous.stop());
    }
    let scheduler = ReminderScheduler::new(
        Arc::clone(&engine.store),
        Arc::new(engine.notice_tx.clone()),
    )
    .with_interval(interval);
    let _guard = engine.runtime.enter();
    *slot = Some(scheduler.start());

    TaskActionResponse::success(
        format!("Reminders running every {} ms.", interval.as_millis()),
        None,
    )
}

/// Stops the reminder loop, waiting for an in-progress tick.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_stop() -> TaskActionResponse {
    let engine = match engine() {
        Ok(engine) => engine,
        Err(err) => return TaskActionResponse::failure(format!("reminders_stop failed: {err}")),
    };
    match engine.scheduler.lock().take() {
        Some(handle) => {
            engine.runtime.block_on(handle.stop());
            TaskActionResponse::success("Reminders stopped.", None)
        }
        None => TaskActionResponse::failure("reminders_stop declined: not_running"),
    }
}

/// Returns and clears reminders fired since the previous call.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_drain() -> Vec<ReminderItem> {
    let Ok(engine) = engine() else {
        return Vec::new();
    };
    let mut rx = engine.notice_rx.lock();
    let mut items = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        items.push(ReminderItem {
            task_id: notice.task_id.to_string(),
            due_epoch_ms: notice.due_at.timestamp_millis(),
            message: notice.to_string(),
            task_name: notice.task_name,
        });
    }
    items
}

fn with_store(
    op: &str,
    f: impl FnOnce(&mut taskify_core::TaskStore<SqliteSlotRepository>) -> TaskActionResponse,
) -> TaskActionResponse {
    match engine() {
        Ok(engine) => f(&mut engine.store.lock()),
        Err(err) => {
            warn!("event={op} module=ffi status=error error_code=engine_unavailable");
            TaskActionResponse::failure(format!("{op} failed: {err}"))
        }
    }
}

fn with_task_id(
    op: &str,
    raw_id: &str,
    f: impl FnOnce(&mut taskify_core::TaskStore<SqliteSlotRepository>, TaskId) -> MutationOutcome,
) -> TaskActionResponse {
    let id = match parse_task_id(raw_id) {
        Ok(id) => id,
        Err(err) => return TaskActionResponse::failure(format!("{op} failed: {err}")),
    };
    with_store(op, |store| {
        TaskActionResponse::from_outcome(op, id, f(store, id))
    })
}

fn parse_task_id(raw: &str) -> Result<TaskId, String> {
    TaskId::parse_str(raw.trim()).map_err(|_| format!("invalid task id `{}`", raw.trim()))
}

fn to_patch(input: TaskUpdateInput) -> Result<TaskPatch, String> {
    let category = input
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(|err| err.to_string())?;
    let due_date = if input.clear_due {
        Some(None)
    } else {
        input
            .due_epoch_ms
            .map(epoch_ms_to_utc)
            .transpose()?
            .map(Some)
    };
    let reminder_minutes_before = if input.clear_reminder {
        Some(None)
    } else {
        input.reminder_minutes_before.map(Some)
    };

    Ok(TaskPatch {
        name: input.name,
        completed: input.completed,
        category,
        due_date,
        reminder_minutes_before,
    })
}

fn epoch_ms_to_utc(ms: i64) -> Result<DateTime<Utc>, String> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| format!("timestamp {ms} is out of range"))
}

fn to_task_item(task: &Task, now: DateTime<Utc>) -> TaskItem {
    TaskItem {
        id: task.id.to_string(),
        name: task.name.clone(),
        completed: task.completed,
        category: task.category.as_str().to_string(),
        due_epoch_ms: task.due_date.map(|due| due.timestamp_millis()),
        reminder_minutes_before: task.reminder_minutes_before,
        reminded: task.reminded,
        created_epoch_ms: task.created_at.timestamp_millis(),
        due_state: classify_due(task, now).as_str().to_string(),
    }
}

fn list_failure(message: String) -> TaskListResponse {
    TaskListResponse {
        ok: false,
        items: Vec::new(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, engine, init_logging, reminders_drain, reminders_start, reminders_stop,
        task_add, task_delete, task_reorder, task_toggle_complete, task_update, tasks_filter,
        tasks_list, tasks_progress, TaskUpdateInput,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_name(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    fn created_id(name: &str, category: &str) -> String {
        let response = task_add(name.to_string(), category.to_string(), None, None);
        assert!(response.ok, "{}", response.message);
        response.task_id.expect("task_add should return task_id")
    }

    #[test]
    fn test_engine_uses_a_fresh_database_per_run() {
        let engine = engine().expect("engine should open");
        let file_name = engine
            .config
            .db_path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("db path should have a file name");
        assert!(file_name.starts_with("taskify-ffi-test-"));
        assert_ne!(engine.config.db_path, super::EngineConfig::default().db_path);
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn task_add_appears_in_list_with_trimmed_name() {
        let name = unique_name("ffi-add");
        let id = created_id(&format!("  {name}  "), "study");

        let listed = tasks_list();
        assert!(listed.ok, "{}", listed.message);
        let item = listed
            .items
            .iter()
            .find(|item| item.id == id)
            .expect("created task should be listed");
        assert_eq!(item.name, name);
        assert_eq!(item.category, "Study");
        assert_eq!(item.due_state, "normal");
    }

    #[test]
    fn task_add_declines_blank_name_and_unknown_category() {
        let blank = task_add("   ".to_string(), "Work".to_string(), None, None);
        assert!(!blank.ok);
        assert!(blank.message.contains("invalid_input"));

        let bad_category = task_add("x".to_string(), "Errands".to_string(), None, None);
        assert!(!bad_category.ok);
        assert!(bad_category.message.contains("unknown category"));
    }

    #[test]
    fn toggle_then_filter_done() {
        let id = created_id(&unique_name("ffi-toggle"), "Health");
        assert!(task_toggle_complete(id.clone()).ok);

        let done = tasks_filter("done".to_string(), "Health".to_string());
        assert!(done.items.iter().any(|item| item.id == id && item.completed));
        let active = tasks_filter("active".to_string(), "all".to_string());
        assert!(active.items.iter().all(|item| item.id != id));
    }

    #[test]
    fn filter_rejects_unknown_labels() {
        let response = tasks_filter("archived".to_string(), "all".to_string());
        assert!(!response.ok);
        assert!(response.items.is_empty());
    }

    #[test]
    fn update_and_delete_round_trip() {
        let id = created_id(&unique_name("ffi-update"), "Work");
        let response = task_update(
            id.clone(),
            TaskUpdateInput {
                name: Some("renamed".to_string()),
                due_epoch_ms: Some(1_700_000_000_000),
                reminder_minutes_before: Some(10),
                ..TaskUpdateInput::default()
            },
        );
        assert!(response.ok, "{}", response.message);
        let item = tasks_list()
            .items
            .into_iter()
            .find(|item| item.id == id)
            .expect("updated task should be listed");
        assert_eq!(item.name, "renamed");
        assert_eq!(item.due_epoch_ms, Some(1_700_000_000_000));
        assert!(!item.reminded);

        assert!(task_delete(id.clone()).ok);
        assert!(!task_delete(id).ok);
    }

    #[test]
    fn reorder_with_unknown_or_invalid_ids_fails() {
        let id = created_id(&unique_name("ffi-reorder"), "Other");
        let missing = taskify_core::TaskId::new_v4().to_string();

        let unknown = task_reorder(id.clone(), missing);
        assert!(!unknown.ok);
        assert!(unknown.message.contains("not_found"));

        let invalid = task_reorder(id.clone(), "not-a-uuid".to_string());
        assert!(!invalid.ok);

        let same = task_reorder(id.clone(), id);
        assert!(same.message.contains("noop_move"));
    }

    #[test]
    fn progress_counts_created_tasks() {
        created_id(&unique_name("ffi-progress"), "Personal");
        let metrics = tasks_progress();
        assert!(metrics.total >= 1);
        assert!(metrics.completed_count <= metrics.total);
        assert!(metrics.percent <= 100);
    }

    #[test]
    fn reminders_fire_for_past_due_task() {
        let name = unique_name("ffi-remind");
        let past_due = chrono::Utc::now().timestamp_millis() - 60_000;
        let created = task_add(name.clone(), "Work".to_string(), Some(past_due), Some(0));
        assert!(created.ok, "{}", created.message);

        assert!(!reminders_start(Some(0)).ok);
        assert!(reminders_start(Some(20)).ok);
        let mut fired = Vec::new();
        for _ in 0..100 {
            fired.extend(reminders_drain());
            if fired.iter().any(|item| item.task_name == name) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        let _ = reminders_stop();

        let item = fired
            .iter()
            .find(|item| item.task_name == name)
            .expect("reminder should fire");
        assert_eq!(item.due_epoch_ms, past_due);
        assert!(item.message.contains(&name));
    }
}
