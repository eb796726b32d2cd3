//! forge
//!
//! Abstraction over the source-control hosting API.
//!
//! The sidecar needs two answers from the host: *who* owns a credential and
//! whether that account may push to the site repository. [`GitHubHost`] is
//! the production implementation; [`mock::MockHost`] backs tests.

pub mod github;
pub mod mock;
pub mod traits;

pub use github::{parse_remote_slug, GitHubHost};
pub use traits::{Host, HostError, Identity, RepoSlug};
