//! auth::verifier
//!
//! Identity and write-access verification.
//!
//! # Flow
//!
//! [`AccessVerifier::verify_credential`] composes the individual steps:
//!
//! 1. Reject non-ASCII credentials before any network call
//! 2. Fetch the identity behind the credential
//! 3. Require a non-empty login
//! 4. Resolve `owner/name` from the configured git remote
//! 5. Require collaborator access for that login
//!
//! Any failing step ends verification with its own error; there is no
//! partial success. Network failures are not retried here.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::errors::AuthError;
use crate::forge::{parse_remote_slug, Host, HostError, Identity, RepoSlug};
use crate::git::GitRunner;

/// Verifies that a credential belongs to an account allowed to publish.
#[derive(Clone)]
pub struct AccessVerifier {
    host: Arc<dyn Host>,
    git: Arc<dyn GitRunner>,
    remote: String,
}

impl std::fmt::Debug for AccessVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessVerifier")
            .field("host", &self.host.name())
            .field("remote", &self.remote)
            .finish()
    }
}

impl AccessVerifier {
    /// Create a verifier that reads the slug from git remote `remote`.
    pub fn new(host: Arc<dyn Host>, git: Arc<dyn GitRunner>, remote: impl Into<String>) -> Self {
        Self {
            host,
            git,
            remote: remote.into(),
        }
    }

    /// Resolve the identity behind `credential`.
    pub async fn fetch_identity(&self, credential: &str) -> Result<Identity, AuthError> {
        self.host
            .fetch_identity(credential)
            .await
            .map_err(|err| match err {
                HostError::Unreachable(msg) => AuthError::HostUnreachable(msg),
                HostError::Status { status: 401, .. } => AuthError::InvalidCredential,
                HostError::Status { status, .. } => AuthError::ProfileFetchFailed { status },
                HostError::InvalidResponse(msg) => AuthError::InvalidResponse(msg),
                HostError::MalformedCredential => AuthError::MalformedCredential,
            })
    }

    /// Derive `owner/name` from the configured remote.
    pub async fn resolve_repository_slug(&self) -> Result<RepoSlug, AuthError> {
        let key = format!("remote.{}.url", self.remote);
        let url = self
            .git
            .run(&["config", "--get", key.as_str()])
            .await
            .unwrap_or_default();

        if url.is_empty() {
            return Err(AuthError::RemoteNotConfigured(format!(
                "remote '{}' has no url",
                self.remote
            )));
        }

        // The URL may embed a credential, so it never goes into the error.
        parse_remote_slug(&url).ok_or_else(|| {
            AuthError::RemoteNotConfigured(format!(
                "cannot parse url of remote '{}'",
                self.remote
            ))
        })
    }

    /// Require `login` to have collaborator access on the site repository.
    pub async fn verify_contributor(&self, credential: &str, login: &str) -> Result<(), AuthError> {
        let slug = self.resolve_repository_slug().await?;

        match self.host.check_collaborator(credential, &slug, login).await {
            Ok(()) => {
                debug!(%slug, %login, "collaborator access confirmed");
                Ok(())
            }
            Err(HostError::Status {
                status: 403 | 404, ..
            }) => {
                warn!(%slug, %login, "login is not a collaborator");
                Err(AuthError::InsufficientPermissions {
                    slug: slug.to_string(),
                })
            }
            Err(HostError::Status { status, .. }) => Err(AuthError::VerificationFailed { status }),
            Err(HostError::Unreachable(msg)) => Err(AuthError::HostUnreachable(msg)),
            Err(HostError::InvalidResponse(msg)) => Err(AuthError::InvalidResponse(msg)),
            Err(HostError::MalformedCredential) => Err(AuthError::MalformedCredential),
        }
    }

    /// Full verification: identity, login, and collaborator access.
    pub async fn verify_credential(&self, credential: &str) -> Result<Identity, AuthError> {
        if !credential.is_ascii() {
            return Err(AuthError::MalformedCredential);
        }

        let identity = self.fetch_identity(credential).await?;
        if !identity.is_valid() {
            return Err(AuthError::MissingLogin);
        }

        self.verify_contributor(credential, &identity.login).await?;
        info!(login = %identity.login, "credential verified");
        Ok(identity)
    }
}
