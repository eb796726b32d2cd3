//! auth::errors
//!
//! Error types for identity and access verification.
//!
//! Error messages MUST NOT contain credentials or credential-bearing URLs.
//!
//! # Example
//!
//! ```
//! use sitecms::auth::AuthError;
//!
//! let err = AuthError::InsufficientPermissions { slug: "acme/site".into() };
//! assert!(err.to_string().contains("acme/site"));
//! ```

use thiserror::Error;

/// Errors from identity and access verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The credential holds characters that cannot be sent to the host.
    #[error("credential contains invalid characters")]
    MalformedCredential,

    /// The host could not be reached. Retriable by the caller.
    #[error("host unreachable: {0}")]
    HostUnreachable(String),

    /// The host rejected the credential.
    #[error("invalid credential")]
    InvalidCredential,

    /// The identity lookup returned an unexpected status.
    #[error("profile fetch failed with status {status}")]
    ProfileFetchFailed {
        /// Upstream HTTP status
        status: u16,
    },

    /// The host returned an identity without a login.
    #[error("host returned an identity without a login")]
    MissingLogin,

    /// The identity is not a collaborator on the repository.
    #[error("insufficient permissions on {slug}")]
    InsufficientPermissions {
        /// Repository `owner/name`
        slug: String,
    },

    /// The collaborator check returned an unexpected status.
    #[error("access verification failed with status {status}")]
    VerificationFailed {
        /// Upstream HTTP status
        status: u16,
    },

    /// The host answered with something that could not be parsed.
    #[error("unexpected host response: {0}")]
    InvalidResponse(String),

    /// The repository remote is unset or cannot be parsed.
    #[error("repository remote not configured: {0}")]
    RemoteNotConfigured(String),
}
