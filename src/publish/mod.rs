//! publish
//!
//! The content publish pipeline.
//!
//! - [`Publisher`]: status, validation, staging, commit and push
//! - [`url`]: credential embedding and redaction for push URLs
//! - [`classify`]: git failure text to failure category
//!
//! Callers are expected to hold the working-tree lock
//! ([`WorktreeLock`](crate::core::ops::lock::WorktreeLock)) around
//! [`Publisher::publish`] and [`Publisher::resync`].

pub mod classify;
mod publisher;
pub mod url;

pub use publisher::{normalize_target, PublishError, PublishOutcome, PublishSettings, Publisher};
