//! Flutter-facing bindings for the Taskify core engine.

pub mod api;
