//! Task domain model.
//!
//! # Responsibility
//! - Define the task record and the inputs accepted by the task store.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is a hard removal from the collection; ids are never recycled.

pub mod task;
