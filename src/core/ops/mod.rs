//! core::ops
//!
//! Concurrency control for working-tree mutations.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive working-tree lock
//!
//! Every mutating operation (publish, resync, content writes) acquires the
//! lock before its first step and holds it until it returns.

pub mod lock;

pub use lock::{LockError, WorktreeLock};
