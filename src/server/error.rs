//! server::error
//!
//! Domain errors rendered as JSON responses.
//!
//! Every failure leaves the server as
//! `{"statusCode": .., "statusMessage": .., "data": ..?}`. Internal failures
//! are logged in full and answered with a generic message, so git output and
//! file-system details stay in the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::content::ContentError;
use crate::core::ops::LockError;
use crate::publish::PublishError;
use crate::secrets::SecretError;

/// An HTTP error response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub data: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Log `detail` and answer 500 with `message`.
    pub fn internal(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        let message = message.into();
        error!(%detail, "{}", message);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Upstream status passthrough; anything unusable becomes 502.
fn upstream(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "statusCode": self.status.as_u16(),
            "statusMessage": self.message,
        });
        if let Some(data) = self.data {
            body["data"] = data;
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        warn!(error = %err, "access check failed");
        match err {
            AuthError::MalformedCredential
            | AuthError::InvalidCredential
            | AuthError::MissingLogin => ApiError::new(StatusCode::UNAUTHORIZED, "Invalid GitHub token"),
            AuthError::InsufficientPermissions { .. } => ApiError::new(
                StatusCode::FORBIDDEN,
                "No write access to the site repository",
            ),
            AuthError::HostUnreachable(_) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "GitHub is unreachable")
            }
            AuthError::ProfileFetchFailed { status } => {
                ApiError::new(upstream(status), "Failed to fetch GitHub profile")
            }
            AuthError::VerificationFailed { status } => {
                ApiError::new(upstream(status), "Failed to verify repository access")
            }
            AuthError::InvalidResponse(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "Unexpected response from GitHub")
            }
            AuthError::RemoteNotConfigured(detail) => {
                ApiError::internal("Repository remote is not configured", detail)
            }
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::CredentialMissing => {
                ApiError::new(StatusCode::UNAUTHORIZED, "GitHub token is missing")
            }
            PublishError::Credential(e) => e.into(),
            PublishError::Access(e) => e.into(),
            PublishError::NothingToPublish => ApiError::bad_request("No changes to publish"),
            PublishError::DisallowedChanges { invalid_paths } => {
                ApiError::bad_request("Disallowed changes")
                    .with_data(json!({ "invalidPaths": invalid_paths }))
            }
            PublishError::NoPublishableChanges => {
                ApiError::bad_request("No publishable changes")
            }
            PublishError::NothingToCommit => ApiError::bad_request("Nothing to commit"),
            PublishError::RemoteNotConfigured(remote) => ApiError::internal(
                "Repository remote is not configured",
                format!("remote '{}' has no url", remote),
            ),
            PublishError::PushForbidden => ApiError::new(
                StatusCode::FORBIDDEN,
                "No permission to push to the repository",
            ),
            PublishError::PushFailed => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Push failed"),
            PublishError::Git(e) => ApiError::internal("Repository command failed", e),
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::InvalidPayload(message) => ApiError::bad_request(message),
            ContentError::Conflict(message) => ApiError::new(StatusCode::CONFLICT, message),
            ContentError::MissingTranslations | ContentError::MissingTemplate => {
                let message = err.to_string();
                ApiError::internal(message.clone(), message)
            }
            other => ApiError::internal("Content update failed", other),
        }
    }
}

impl From<LockError> for ApiError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::AlreadyLocked => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            other => ApiError::internal("Cannot lock the working tree", other),
        }
    }
}

impl From<SecretError> for ApiError {
    fn from(err: SecretError) -> Self {
        ApiError::internal("Credential storage failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitError;

    #[test]
    fn disallowed_changes_carry_invalid_paths() {
        let err: ApiError = PublishError::DisallowedChanges {
            invalid_paths: vec!["package.json".into()],
        }
        .into();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.data, Some(json!({"invalidPaths": ["package.json"]})));
    }

    #[test]
    fn taxonomy_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (PublishError::CredentialMissing.into(), StatusCode::UNAUTHORIZED),
            (AuthError::InvalidCredential.into(), StatusCode::UNAUTHORIZED),
            (
                AuthError::InsufficientPermissions {
                    slug: "acme/site".into(),
                }
                .into(),
                StatusCode::FORBIDDEN,
            ),
            (PublishError::PushForbidden.into(), StatusCode::FORBIDDEN),
            (
                ContentError::Conflict("beta.json already exists".into()).into(),
                StatusCode::CONFLICT,
            ),
            (LockError::AlreadyLocked.into(), StatusCode::CONFLICT),
            (
                AuthError::HostUnreachable("dns".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AuthError::ProfileFetchFailed { status: 429 }.into(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (PublishError::PushFailed.into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status, expected, "{:?}", err);
        }
    }

    #[test]
    fn odd_upstream_status_becomes_bad_gateway() {
        let err: ApiError = AuthError::VerificationFailed { status: 302 }.into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn git_failure_output_not_exposed() {
        let err: ApiError = PublishError::Git(GitError::CommandFailed {
            command: "commit".into(),
            code: Some(128),
            output: "fatal: https://ghp_secret@github.com".into(),
        })
        .into();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("ghp_secret"));
        assert!(err.data.is_none());
    }
}
