//! forge::traits
//!
//! Host trait definition for the source-control hosting API.
//!
//! # Design
//!
//! The `Host` trait is async because every call is network I/O. It reports
//! raw outcomes (identity, HTTP status); deciding what a status *means* for
//! access control is the job of [`crate::auth::AccessVerifier`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from host API calls.
///
/// Messages never include the credential.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The host could not be reached (DNS, TLS, connection reset...).
    #[error("host unreachable: {0}")]
    Unreachable(String),

    /// The host answered with an unexpected status.
    #[error("host returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message from the API, if any
        message: String,
    },

    /// The response body could not be understood.
    #[error("invalid host response: {0}")]
    InvalidResponse(String),

    /// The credential cannot be sent as an HTTP header.
    #[error("credential contains characters that cannot be sent")]
    MalformedCredential,
}

/// The authenticated account behind a credential.
///
/// Derived per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Account login (required for the identity to be valid)
    pub login: String,
    /// Display name, falling back to the login
    pub name: String,
    /// Avatar image URL (may be empty)
    pub avatar_url: String,
}

impl Identity {
    /// Whether the identity carries a usable login.
    pub fn is_valid(&self) -> bool {
        !self.login.trim().is_empty()
    }
}

/// `owner/name` of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    /// User or organization
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Trait for source-control hosting APIs.
#[async_trait]
pub trait Host: Send + Sync {
    /// Get the host name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Resolve the account that owns `credential`.
    async fn fetch_identity(&self, credential: &str) -> Result<Identity, HostError>;

    /// Check that `login` is a collaborator on `slug`.
    ///
    /// `Ok(())` only for the host's "is a collaborator" answer; every other
    /// answer is reported as [`HostError::Status`].
    async fn check_collaborator(
        &self,
        credential: &str,
        slug: &RepoSlug,
        login: &str,
    ) -> Result<(), HostError>;
}
