//! secrets
//!
//! Credential storage for the source-control host token.
//!
//! # Architecture
//!
//! - [`SecretStore`]: key-value trait for secret backends
//! - [`EnvFileStore`]: `KEY=value` key file (the site's `.env.local`)
//! - [`CredentialStore`]: the single host credential, with an in-process
//!   mirror so a save is visible immediately
//!
//! # Security
//!
//! - Secrets are **never** logged or included in error messages
//! - The key file uses 0600 permissions on Unix
//! - All writes are atomic (temp file + rename)
//!
//! # Example
//!
//! ```
//! use sitecms::secrets::{CredentialStore, EnvFileStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let creds = CredentialStore::new(
//!     Box::new(EnvFileStore::new(dir.path().join(".env.local"))),
//!     "CMS_GITHUB_TOKEN",
//! );
//!
//! assert!(creds.read().unwrap().is_none());
//! creds.save("ghp_example").unwrap();
//! assert!(creds.read().unwrap().is_some());
//! ```

mod credential;
mod file_store;
mod traits;

pub use credential::CredentialStore;
pub use file_store::EnvFileStore;
pub use traits::{SecretError, SecretStore};

/// The default key the host credential is stored under.
pub const DEFAULT_CREDENTIAL_KEY: &str = "CMS_GITHUB_TOKEN";
