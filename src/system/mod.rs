//! Core system plumbing shared between tasks
pub mod event;
pub mod resources;
