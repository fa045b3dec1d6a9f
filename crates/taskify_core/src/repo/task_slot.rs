//! Task slot persistence contracts and implementations.
//!
//! # Responsibility
//! - Store the whole task collection as one encoded payload under a named
//!   slot key.
//! - Recover from missing or corrupt payloads by yielding an empty
//!   collection.
//!
//! # Invariants
//! - `save` always replaces the whole payload; there are no partial writes.
//! - `load` never returns an error to the caller.
//! - Payload encoding is a JSON array of camelCase task records.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task::Task;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Default slot key used by the app.
pub const DEFAULT_SLOT_KEY: &str = "taskify-tasks";

pub type SlotResult<T> = Result<T, SlotError>;

/// Errors from slot read/write paths.
#[derive(Debug)]
pub enum SlotError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Collection could not be encoded.
    Encode(serde_json::Error),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode task collection: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task slot requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for SlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for SlotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SlotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable single-slot storage for the task collection.
///
/// Implementors provide raw payload access; `load`/`save` supply the shared
/// encoding and recovery policy.
pub trait TaskSlotRepository {
    /// Name of the slot this repository reads and writes.
    fn slot_key(&self) -> &str;

    /// Reads the raw payload. `Ok(None)` means the slot was never written.
    fn read_payload(&self) -> SlotResult<Option<String>>;

    /// Overwrites the raw payload.
    fn write_payload(&self, payload: &str) -> SlotResult<()>;

    /// Loads the collection, substituting an empty one for absent or corrupt
    /// state.
    fn load(&self) -> Vec<Task> {
        let payload = match self.read_payload() {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!(
                    "event=slot_load module=repo status=ok slot={} reason=absent count=0",
                    self.slot_key()
                );
                return Vec::new();
            }
            Err(err) => {
                error!(
                    "event=slot_load module=repo status=error slot={} error_code=slot_read_failed error={}",
                    self.slot_key(),
                    err
                );
                return Vec::new();
            }
        };

        match decode_collection(&payload) {
            Ok(tasks) => {
                info!(
                    "event=slot_load module=repo status=ok slot={} count={}",
                    self.slot_key(),
                    tasks.len()
                );
                tasks
            }
            Err(err) => {
                warn!(
                    "event=slot_load module=repo status=recovered slot={} reason=corrupt payload_bytes={} error={}",
                    self.slot_key(),
                    payload.len(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Encodes and writes the whole collection.
    fn save(&self, tasks: &[Task]) -> SlotResult<()> {
        let payload = encode_collection(tasks)?;
        self.write_payload(&payload)?;
        debug!(
            "event=slot_save module=repo status=ok slot={} count={} payload_bytes={}",
            self.slot_key(),
            tasks.len(),
            payload.len()
        );
        Ok(())
    }
}

/// Encodes a collection into the slot wire format.
pub fn encode_collection(tasks: &[Task]) -> SlotResult<String> {
    serde_json::to_string(tasks).map_err(SlotError::Encode)
}

/// Decodes a slot payload. A `null` payload decodes to an empty collection.
pub fn decode_collection(payload: &str) -> Result<Vec<Task>, serde_json::Error> {
    let tasks: Option<Vec<Task>> = serde_json::from_str(payload)?;
    Ok(tasks.unwrap_or_default())
}

/// SQLite-backed slot repository over the `kv_slots` table.
pub struct SqliteSlotRepository {
    conn: Connection,
    slot_key: String,
}

impl SqliteSlotRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the connection did not come from
    ///   `open_db`/`open_db_in_memory`.
    pub fn try_new(conn: Connection, slot_key: impl Into<String>) -> SlotResult<Self> {
        let actual_version = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(SlotError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        Ok(Self {
            conn,
            slot_key: slot_key.into(),
        })
    }
}

impl TaskSlotRepository for SqliteSlotRepository {
    fn slot_key(&self) -> &str {
        &self.slot_key
    }

    fn read_payload(&self) -> SlotResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM kv_slots WHERE slot_key = ?1;",
                [self.slot_key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn write_payload(&self, payload: &str) -> SlotResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (slot_key, payload, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(slot_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at;",
            params![self.slot_key.as_str(), payload],
        )?;
        Ok(())
    }
}

/// In-process slot repository.
///
/// Clones share the same cell, so a test can keep a handle to inspect or
/// corrupt the payload the store writes.
#[derive(Debug, Clone)]
pub struct MemorySlotRepository {
    slot_key: String,
    payload: Arc<Mutex<Option<String>>>,
}

impl MemorySlotRepository {
    pub fn new() -> Self {
        Self::with_payload(None)
    }

    /// Seeds the slot with a raw payload, valid or not.
    pub fn with_payload(payload: Option<String>) -> Self {
        Self {
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            payload: Arc::new(Mutex::new(payload)),
        }
    }

    /// Current raw payload.
    pub fn payload(&self) -> Option<String> {
        self.payload.lock().clone()
    }
}

impl Default for MemorySlotRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSlotRepository for MemorySlotRepository {
    fn slot_key(&self) -> &str {
        &self.slot_key
    }

    fn read_payload(&self) -> SlotResult<Option<String>> {
        Ok(self.payload.lock().clone())
    }

    fn write_payload(&self, payload: &str) -> SlotResult<()> {
        *self.payload.lock() = Some(payload.to_string());
        Ok(())
    }
}
