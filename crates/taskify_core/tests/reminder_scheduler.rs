use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use taskify_core::{
    Category, Clock, ManualClock, MemorySlotRepository, ReminderNotice, ReminderScheduler,
    ReminderSink, SharedTaskStore, TaskDraft, TaskId, TaskPatch, TaskSlotRepository, TaskStore,
};
use tokio::sync::mpsc;

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

struct Fixture {
    store: SharedTaskStore<MemorySlotRepository>,
    repo: MemorySlotRepository,
    clock: ManualClock,
    notices: mpsc::UnboundedReceiver<ReminderNotice>,
    scheduler: ReminderScheduler<MemorySlotRepository>,
}

fn fixture() -> Fixture {
    let repo = MemorySlotRepository::new();
    let clock = ManualClock::new(start_time());
    let store = TaskStore::open_with_clock(repo.clone(), Arc::new(clock.clone())).into_shared();
    let (tx, notices) = mpsc::unbounded_channel();
    let scheduler = ReminderScheduler::new(Arc::clone(&store), Arc::new(tx));
    Fixture {
        store,
        repo,
        clock,
        notices,
        scheduler,
    }
}

fn add_due_task(fx: &Fixture, name: &str, due_in_minutes: i64, remind_before: u32) -> TaskId {
    let due = fx.clock_now() + Duration::minutes(due_in_minutes);
    fx.store
        .lock()
        .add(
            TaskDraft::new(name, Category::Work)
                .due_at(due)
                .remind_before(remind_before),
        )
        .unwrap()
}

impl Fixture {
    fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn reminded(&self, id: TaskId) -> bool {
        self.store.lock().get(id).unwrap().reminded
    }

    fn drain(&mut self) -> Vec<ReminderNotice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }
}

#[test]
fn reminder_fires_exactly_once() {
    let mut fx = fixture();
    let id = add_due_task(&fx, "submit form", 10, 15);

    assert_eq!(fx.scheduler.tick(), 1);
    let fired = fx.drain();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].task_id, id);
    assert_eq!(fired[0].task_name, "submit form");
    assert_eq!(fired[0].due_at, start_time() + Duration::minutes(10));
    assert!(fx.reminded(id));

    assert_eq!(fx.scheduler.tick(), 0);
    fx.clock.advance(Duration::hours(2));
    assert_eq!(fx.scheduler.tick(), 0);
    assert!(fx.drain().is_empty());
}

#[test]
fn reminder_waits_for_window_to_open() {
    let mut fx = fixture();
    let id = add_due_task(&fx, "dentist", 60, 15);

    assert_eq!(fx.scheduler.tick(), 0);
    fx.clock.advance(Duration::minutes(44));
    assert_eq!(fx.scheduler.tick(), 0);
    assert!(!fx.reminded(id));

    fx.clock.advance(Duration::minutes(1));
    assert_eq!(fx.scheduler.tick(), 1);
    assert_eq!(fx.drain().len(), 1);
}

#[test]
fn completed_task_never_fires() {
    let mut fx = fixture();
    let id = add_due_task(&fx, "done already", 10, 15);
    fx.store.lock().toggle_complete(id);

    assert_eq!(fx.scheduler.tick(), 0);
    fx.clock.advance(Duration::days(1));
    assert_eq!(fx.scheduler.tick(), 0);
    assert!(fx.drain().is_empty());
    assert!(!fx.reminded(id));
}

#[test]
fn tasks_missing_schedule_fields_are_skipped() {
    let mut fx = fixture();
    let due = start_time() - Duration::minutes(1);
    {
        let mut store = fx.store.lock();
        store.add(TaskDraft::new("no offset", Category::Study).due_at(due));
        store.add(TaskDraft::new("no due", Category::Study).remind_before(5));
        store.add(TaskDraft::new("nothing", Category::Study));
    }

    assert_eq!(fx.scheduler.tick(), 0);
    assert!(fx.drain().is_empty());
}

#[test]
fn multiple_due_tasks_fire_in_one_tick() {
    let mut fx = fixture();
    let first = add_due_task(&fx, "one", 5, 10);
    let second = add_due_task(&fx, "two", -30, 0);
    let later = add_due_task(&fx, "three", 120, 10);

    assert_eq!(fx.scheduler.tick(), 2);
    let mut fired = fx.drain().into_iter().map(|n| n.task_id).collect::<Vec<_>>();
    fired.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(fired, expected);
    assert!(!fx.reminded(later));
}

#[test]
fn schedule_edit_rearms_reminder() {
    let mut fx = fixture();
    let id = add_due_task(&fx, "review", 10, 15);
    fx.scheduler.tick();
    assert!(fx.reminded(id));
    fx.drain();

    let new_due = start_time() + Duration::hours(3);
    fx.store.lock().update(
        id,
        TaskPatch {
            due_date: Some(Some(new_due)),
            ..TaskPatch::default()
        },
    );
    assert!(!fx.reminded(id));
    assert_eq!(fx.scheduler.tick(), 0);

    fx.clock.set(new_due - Duration::minutes(15));
    assert_eq!(fx.scheduler.tick(), 1);
    assert_eq!(fx.drain()[0].due_at, new_due);
}

#[test]
fn offset_edit_with_same_value_still_resets_reminded() {
    let fx = fixture();
    let id = add_due_task(&fx, "pay rent", 10, 15);
    fx.scheduler.tick();
    assert!(fx.reminded(id));

    fx.store.lock().update(
        id,
        TaskPatch {
            reminder_minutes_before: Some(Some(15)),
            ..TaskPatch::default()
        },
    );
    assert!(!fx.reminded(id));
}

#[test]
fn non_schedule_edit_keeps_reminded() {
    let fx = fixture();
    let id = add_due_task(&fx, "standup", 10, 15);
    fx.scheduler.tick();

    fx.store.lock().update(
        id,
        TaskPatch {
            name: Some("daily standup".to_string()),
            category: Some(Category::Other),
            ..TaskPatch::default()
        },
    );
    assert!(fx.reminded(id));
}

#[test]
fn closed_channel_still_marks_reminded() {
    let fx = fixture();
    let Fixture {
        store,
        repo,
        notices,
        scheduler,
        ..
    } = fx;
    drop(notices);
    let id = {
        let due = start_time() + Duration::minutes(1);
        store
            .lock()
            .add(TaskDraft::new("lost", Category::Health).due_at(due).remind_before(5))
            .unwrap()
    };

    assert_eq!(scheduler.tick(), 1);
    assert!(store.lock().get(id).unwrap().reminded);
    assert_eq!(scheduler.tick(), 0);
    assert!(repo.load().iter().all(|task| task.reminded));
}

#[test]
fn due_date_at_earliest_instant_fires_without_panicking() {
    let mut fx = fixture();
    let id = fx
        .store
        .lock()
        .add(
            TaskDraft::new("ancient", Category::Work)
                .due_at(DateTime::<Utc>::MIN_UTC)
                .remind_before(1),
        )
        .unwrap();

    assert_eq!(fx.scheduler.tick(), 1);
    assert_eq!(fx.drain()[0].due_at, DateTime::<Utc>::MIN_UTC);
    assert!(fx.reminded(id));
    assert_eq!(fx.scheduler.tick(), 0);
}

#[test]
fn reminded_flag_is_persisted() {
    let fx = fixture();
    let id = add_due_task(&fx, "persist me", 1, 5);
    fx.scheduler.tick();

    let persisted = fx.repo.load();
    assert!(persisted.iter().find(|task| task.id == id).unwrap().reminded);
}

struct CountingSink(Arc<std::sync::atomic::AtomicUsize>);

impl ReminderSink for CountingSink {
    fn deliver(&self, _notice: &ReminderNotice) -> Result<(), taskify_core::DeliveryError> {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn custom_sink_receives_each_notice() {
    let fx = fixture();
    let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let scheduler = ReminderScheduler::new(
        Arc::clone(&fx.store),
        Arc::new(CountingSink(Arc::clone(&count))),
    );
    add_due_task(&fx, "a", 1, 5);
    add_due_task(&fx, "b", 2, 5);

    scheduler.tick();
    scheduler.tick();
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn background_loop_ticks_on_interval() {
    let mut fx = fixture();
    let id = add_due_task(&fx, "loop", 10, 15);
    let scheduler = ReminderScheduler::new(Arc::clone(&fx.store), {
        let (tx, rx) = mpsc::unbounded_channel();
        fx.notices = rx;
        Arc::new(tx)
    })
    .with_interval(StdDuration::from_millis(500));

    let handle = scheduler.start();
    let notice = tokio::time::timeout(StdDuration::from_secs(5), fx.notices.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notice.task_id, id);
    assert!(fx.reminded(id));

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stopped_loop_fires_nothing_further() {
    let mut fx = fixture();
    let (tx, rx) = mpsc::unbounded_channel();
    fx.notices = rx;
    let scheduler = ReminderScheduler::new(Arc::clone(&fx.store), Arc::new(tx))
        .with_interval(StdDuration::from_millis(100));

    let handle = scheduler.start();
    tokio::time::sleep(StdDuration::from_millis(250)).await;
    handle.stop().await;

    let id = add_due_task(&fx, "after stop", 1, 5);
    tokio::time::sleep(StdDuration::from_secs(2)).await;

    assert!(fx.notices.recv().await.is_none());
    assert!(!fx.reminded(id));
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_one_interval() {
    let mut fx = fixture();
    let (tx, rx) = mpsc::unbounded_channel();
    fx.notices = rx;
    let id = add_due_task(&fx, "patient", 1, 5);
    let scheduler = ReminderScheduler::new(Arc::clone(&fx.store), Arc::new(tx))
        .with_interval(StdDuration::from_secs(60));

    let handle = scheduler.start();
    tokio::time::sleep(StdDuration::from_secs(30)).await;
    assert!(!fx.reminded(id));

    tokio::time::sleep(StdDuration::from_secs(31)).await;
    assert!(fx.reminded(id));
    handle.stop().await;
}
