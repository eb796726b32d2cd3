//! core
//!
//! Configuration, storage locations and concurrency control.
//!
//! # Modules
//!
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for site storage
//! - [`ops`] - Exclusive working-tree lock

pub mod config;
pub mod ops;
pub mod paths;
