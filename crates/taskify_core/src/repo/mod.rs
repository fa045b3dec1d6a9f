//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the single-slot persistence contract for the task collection.
//! - Isolate SQLite details from the task store.
//!
//! # Invariants
//! - Writes replace the whole collection.
//! - Reads recover from absent/corrupt state instead of failing the caller.

pub mod task_slot;
