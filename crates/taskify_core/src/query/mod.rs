//! Pure read-side views over a task snapshot.
//!
//! # Responsibility
//! - Filter by status and category.
//! - Compute completion progress.
//! - Classify due state for display.
//!
//! # Invariants
//! - Functions are stateless and never mutate their input.
//! - Filtered views keep collection order.

pub mod due;
pub mod filter;
pub mod progress;

pub use due::{classify_due, DueState};
pub use filter::{filter_tasks, CategoryFilter, InvalidFilter, StatusFilter};
pub use progress::{progress, Progress};
