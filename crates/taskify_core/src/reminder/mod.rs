//! Reminder evaluation and delivery.
//!
//! # Responsibility
//! - Turn an opened reminder window into exactly one outbound notice.
//! - Mark fired tasks as reminded through the task store.
//!
//! # Invariants
//! - Only incomplete, un-reminded tasks with both schedule fields are
//!   evaluated.
//! - Delivery is at-most-once: a failed delivery still marks the task.
//! - Cancellation never interrupts a tick in progress.

pub mod notice;
pub mod scheduler;

pub use notice::{DeliveryError, LogSink, ReminderNotice, ReminderSink};
pub use scheduler::{ReminderScheduler, SchedulerHandle, DEFAULT_TICK_INTERVAL};
