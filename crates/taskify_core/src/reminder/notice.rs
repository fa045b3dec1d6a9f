//! Outbound reminder signal and delivery sinks.

use crate::model::task::TaskId;
use chrono::{DateTime, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;

/// One reminder firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotice {
    pub task_id: TaskId,
    pub task_name: String,
    pub due_at: DateTime<Utc>,
}

impl Display for ReminderNotice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reminder: \"{}\" is due at {}",
            self.task_name,
            self.due_at.to_rfc3339()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The receiving side has gone away.
    ChannelClosed,
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChannelClosed => write!(f, "reminder channel closed"),
        }
    }
}

impl Error for DeliveryError {}

/// Presentation-side receiver of reminder notices.
///
/// Delivery is fire-and-forget; the scheduler never retries a failed notice.
pub trait ReminderSink: Send + Sync {
    fn deliver(&self, notice: &ReminderNotice) -> Result<(), DeliveryError>;
}

impl ReminderSink for mpsc::UnboundedSender<ReminderNotice> {
    fn deliver(&self, notice: &ReminderNotice) -> Result<(), DeliveryError> {
        self.send(notice.clone())
            .map_err(|_| DeliveryError::ChannelClosed)
    }
}

/// Sink that records notices in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ReminderSink for LogSink {
    fn deliver(&self, notice: &ReminderNotice) -> Result<(), DeliveryError> {
        info!(
            "event=reminder_delivered module=reminder status=ok sink=log task_id={} due_at={}",
            notice.task_id,
            notice.due_at.to_rfc3339()
        );
        Ok(())
    }
}
