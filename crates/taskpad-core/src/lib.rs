//! Core abstractions for Taskpad: the task domain model, the capability
//! contracts the rest of the workspace is wired through (durable key-value
//! storage, reminder scheduling, id generation), and the pure filter engine.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod filter;
pub mod id;
pub mod scheduler;
pub mod storage;
pub mod tasks;
