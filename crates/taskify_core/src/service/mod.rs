//! Core use-case services.
//!
//! # Responsibility
//! - Own the task collection and funnel every mutation through one surface.
//! - Keep FFI/UI layers decoupled from slot storage details.

pub mod task_store;
