//! Reminder scheduler background loop.
//!
//! Spawns a tokio task that periodically checks the task store for tasks
//! whose reminder window has opened, emits one notice per task, and marks
//! them reminded through the store.

use crate::clock::Clock;
use crate::reminder::notice::{ReminderNotice, ReminderSink};
use crate::repo::task_slot::TaskSlotRepository;
use crate::service::task_store::SharedTaskStore;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default interval between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic reminder evaluator bound to one store.
pub struct ReminderScheduler<R: TaskSlotRepository> {
    store: SharedTaskStore<R>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ReminderSink>,
    interval: Duration,
}

impl<R: TaskSlotRepository + Send + 'static> ReminderScheduler<R> {
    /// Creates a scheduler that evaluates against the store's clock.
    pub fn new(store: SharedTaskStore<R>, sink: Arc<dyn ReminderSink>) -> Self {
        let clock = store.lock().clock();
        Self {
            store,
            clock,
            sink,
            interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Overrides the evaluation clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the tick interval. Zero is raised to one millisecond.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_TICK_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one evaluation pass and returns the number of reminders fired.
    ///
    /// The store lock is held for the whole pass, so no caller mutation can
    /// interleave with it.
    pub fn tick(&self) -> usize {
        let now = self.clock.now();
        let mut store = self.store.lock();

        let due = store
            .tasks()
            .iter()
            .filter(|task| task.reminder_due(now))
            .filter_map(|task| {
                Some(ReminderNotice {
                    task_id: task.id,
                    task_name: task.name.clone(),
                    due_at: task.due_date?,
                })
            })
            .collect::<Vec<_>>();

        for notice in &due {
            if let Err(err) = self.sink.deliver(notice) {
                warn!(
                    "event=reminder_fire module=reminder status=undelivered task_id={} error={}",
                    notice.task_id, err
                );
            }
            store.mark_reminded(notice.task_id);
        }

        if due.is_empty() {
            debug!("event=reminder_tick module=reminder status=ok fired=0");
        } else {
            info!(
                "event=reminder_tick module=reminder status=ok fired={}",
                due.len()
            );
        }
        due.len()
    }

    /// Starts the background loop on the current tokio runtime.
    ///
    /// The first tick runs one interval after start.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime context.
    pub fn start(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            info!(
                "event=reminder_start module=reminder status=ok interval_ms={}",
                self.interval.as_millis()
            );
            let mut ticker =
                tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.tick();
                    }
                }
            }
            info!("event=reminder_stop module=reminder status=ok");
        });

        SchedulerHandle { cancel, join }
    }
}

/// Running scheduler loop. Dropping the handle cancels the loop.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Requests stop without waiting. No further tick starts afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancels the loop and waits for an in-progress tick to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Err(err) = (&mut self.join).await {
            error!("event=reminder_stop module=reminder status=error error={err}");
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
