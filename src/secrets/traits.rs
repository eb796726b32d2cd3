//! secrets::traits
//!
//! Secret storage trait definition.
//!
//! # Design
//!
//! The `SecretStore` trait is a small key-value interface. Keys are plain
//! names such as `CMS_GITHUB_TOKEN`; implementations store them verbatim.
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secrets in error messages
//! - Be thread-safe (Send + Sync)

use thiserror::Error;

/// Errors from secret storage operations.
///
/// Note: Error messages intentionally do not include secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Failed to read from secret storage.
    #[error("failed to read secret: {0}")]
    ReadError(String),

    /// Failed to write to secret storage.
    #[error("failed to write secret: {0}")]
    WriteError(String),

    /// The key or value cannot be represented by the backing format.
    #[error("invalid secret entry: {0}")]
    InvalidEntry(String),
}

/// Trait for secret storage providers.
///
/// Implementations must be thread-safe (Send + Sync) and must never
/// log, print, or include secret values in error messages.
pub trait SecretStore: Send + Sync {
    /// Get a secret by key.
    ///
    /// Returns `Ok(None)` if the secret does not exist, including when the
    /// backing storage has never been created.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Set a secret, overwriting any existing value for the key.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Delete a secret.
    ///
    /// Returns `Ok(())` even if the secret did not exist.
    fn delete(&self, key: &str) -> Result<(), SecretError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SecretError::ReadError("disk full".into());
        assert!(err.to_string().contains("read"));

        let err = SecretError::WriteError("permission denied".into());
        assert!(err.to_string().contains("write"));

        let err = SecretError::InvalidEntry("newline in value".into());
        assert!(err.to_string().contains("invalid"));
    }
}
