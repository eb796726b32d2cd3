//! forge::mock
//!
//! Mock host implementation for deterministic testing.
//!
//! # Design
//!
//! Identities are registered per credential and collaborators per
//! `owner/name`. Failures can be injected per operation, and every call is
//! recorded for verification.
//!
//! # Example
//!
//! ```
//! use sitecms::forge::mock::MockHost;
//! use sitecms::forge::{Host, RepoSlug};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let slug = RepoSlug { owner: "acme".into(), name: "site".into() };
//! let host = MockHost::new()
//!     .with_user("ghp_editor", "editor")
//!     .with_collaborator(&slug, "editor");
//!
//! let identity = host.fetch_identity("ghp_editor").await.unwrap();
//! assert_eq!(identity.login, "editor");
//! assert!(host.check_collaborator("ghp_editor", &slug, "editor").await.is_ok());
//! # });
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{Host, HostError, Identity, RepoSlug};

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail fetch_identity with the given error.
    FetchIdentity(HostError),
    /// Fail check_collaborator with the given error.
    CheckCollaborator(HostError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    FetchIdentity,
    CheckCollaborator { slug: String, login: String },
}

#[derive(Debug, Default)]
struct MockHostInner {
    users: HashMap<String, Identity>,
    collaborators: HashSet<(String, String)>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Mock host for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    inner: Arc<Mutex<MockHostInner>>,
}

impl MockHost {
    /// Create an empty mock host: every credential is rejected with 401.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `credential` as belonging to `login`.
    pub fn with_user(self, credential: &str, login: &str) -> Self {
        self.lock().users.insert(
            credential.to_string(),
            Identity {
                login: login.to_string(),
                name: login.to_string(),
                avatar_url: String::new(),
            },
        );
        self
    }

    /// Grant `login` collaborator access on `slug`.
    pub fn with_collaborator(self, slug: &RepoSlug, login: &str) -> Self {
        self.lock()
            .collaborators
            .insert((slug.to_string(), login.to_string()));
        self
    }

    /// Make an operation fail.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Recorded operations, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockHostInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Host for MockHost {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_identity(&self, credential: &str) -> Result<Identity, HostError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::FetchIdentity);

        if let Some(FailOn::FetchIdentity(err)) = &inner.fail_on {
            return Err(err.clone());
        }

        inner
            .users
            .get(credential)
            .cloned()
            .ok_or_else(|| HostError::Status {
                status: 401,
                message: "Bad credentials".into(),
            })
    }

    async fn check_collaborator(
        &self,
        _credential: &str,
        slug: &RepoSlug,
        login: &str,
    ) -> Result<(), HostError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::CheckCollaborator {
            slug: slug.to_string(),
            login: login.to_string(),
        });

        if let Some(FailOn::CheckCollaborator(err)) = &inner.fail_on {
            return Err(err.clone());
        }

        if inner
            .collaborators
            .contains(&(slug.to_string(), login.to_string()))
        {
            Ok(())
        } else {
            Err(HostError::Status {
                status: 404,
                message: "Not Found".into(),
            })
        }
    }
}
