//! publish::publisher
//!
//! Commits pending content changes and pushes them to the site remote.
//!
//! # Pipeline
//!
//! 1. Resolve the credential (stored, else the configured fallback)
//! 2. Read `git status --porcelain` and extract changed paths
//! 3. Apply the deployment's allow-list policy
//! 4. Normalize targets against `rev-parse --show-prefix`, keep existing ones
//! 5. Verify collaborator access (when enabled)
//! 6. Stage all targets in one `git add`
//! 7. Commit with a timestamped message
//! 8. Resolve branch and remote URL
//! 9. Push to a credential-bearing URL
//! 10. Return the branch and the redacted remote
//!
//! Steps run strictly in order. Validation failures (steps 1 to 5) happen
//! before anything is staged. Publishing again with no new changes stops at
//! step 2.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::classify::{classify, FailureKind, Stage};
use super::url::{attach_credential, redact_url, scrub};
use crate::auth::{AccessVerifier, AuthError};
use crate::git::{
    extract_changed_paths, unique_list, AllowList, AllowPolicy, GitError, GitRunner,
};
use crate::secrets::{CredentialStore, SecretError};

/// Errors from publishing.
///
/// None of the variants carry the credential or a credential-bearing URL.
#[derive(Debug, Error)]
pub enum PublishError {
    /// No stored credential and no fallback.
    #[error("credential missing")]
    CredentialMissing,

    /// The credential store could not be read.
    #[error(transparent)]
    Credential(#[from] SecretError),

    /// Access verification failed.
    #[error(transparent)]
    Access(#[from] AuthError),

    /// The working tree has no changes.
    #[error("nothing to publish")]
    NothingToPublish,

    /// Changes exist outside the allowed roots.
    #[error("disallowed changes: {}", invalid_paths.join(", "))]
    DisallowedChanges {
        /// Offending paths, deduplicated
        invalid_paths: Vec<String>,
    },

    /// No change survived the allow-list and existence checks.
    #[error("no publishable changes")]
    NoPublishableChanges,

    /// Staging produced nothing to commit.
    #[error("nothing to commit")]
    NothingToCommit,

    /// The configured remote has no URL.
    #[error("remote '{0}' is not configured")]
    RemoteNotConfigured(String),

    /// The remote refused the push for lack of permission.
    #[error("push forbidden: no write access to the repository")]
    PushForbidden,

    /// The push failed for another reason.
    #[error("push failed")]
    PushFailed,

    /// Any other git failure.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// Branch that was pushed
    pub branch: String,
    /// Remote URL with credentials removed
    pub remote: String,
}

/// Publish behaviour for one deployment.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Git remote to push to
    pub remote: String,
    /// Active allow-list policy
    pub policy: AllowPolicy,
    /// Roots and extensions
    pub allow_list: AllowList,
    /// Re-verify collaborator access before staging
    pub verify_access: bool,
    /// Commit message prefix; an ISO-8601 timestamp is appended
    pub commit_prefix: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            policy: AllowPolicy::default(),
            allow_list: AllowList::default(),
            verify_access: true,
            commit_prefix: "CMS: update content".to_string(),
        }
    }
}

/// Publishes the site working tree.
pub struct Publisher {
    git: Arc<dyn GitRunner>,
    credentials: Arc<CredentialStore>,
    verifier: AccessVerifier,
    site_root: PathBuf,
    settings: PublishSettings,
    fallback_credential: Option<String>,
}

// Custom Debug to avoid exposing the fallback credential
impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("site_root", &self.site_root)
            .field("settings", &self.settings)
            .field("has_fallback_credential", &self.fallback_credential.is_some())
            .finish()
    }
}

impl Publisher {
    /// Create a publisher for the working tree at `site_root`.
    pub fn new(
        git: Arc<dyn GitRunner>,
        credentials: Arc<CredentialStore>,
        verifier: AccessVerifier,
        site_root: impl Into<PathBuf>,
        settings: PublishSettings,
    ) -> Self {
        Self {
            git,
            credentials,
            verifier,
            site_root: site_root.into(),
            settings,
            fallback_credential: None,
        }
    }

    /// Credential used when nothing is stored (e.g. from the environment).
    pub fn with_fallback_credential(mut self, credential: Option<String>) -> Self {
        self.fallback_credential = credential.filter(|c| !c.is_empty());
        self
    }

    /// Active settings.
    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Run the full publish pipeline.
    pub async fn publish(&self) -> Result<PublishOutcome, PublishError> {
        let credential = self.resolve_credential()?;

        let status = self.git.run(&["status", "--porcelain"]).await?;
        let changed = extract_changed_paths(&status);
        if changed.is_empty() {
            return Err(PublishError::NothingToPublish);
        }
        debug!(count = changed.len(), "changed paths found");

        let candidates = self.apply_policy(&changed)?;
        let targets = self.existing_targets(candidates).await?;
        if targets.is_empty() {
            return Err(PublishError::NoPublishableChanges);
        }

        if self.settings.verify_access {
            self.verifier.verify_credential(&credential).await?;
        }

        let mut add_args = vec!["add", "-A", "--"];
        add_args.extend(targets.iter().map(String::as_str));
        self.git.run(&add_args).await?;
        info!(targets = ?targets, "staged content");

        self.commit().await?;

        let branch = self
            .git
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        let remote = self.remote_url().await?;

        let push_url = attach_credential(&remote, &credential);
        let redacted = redact_url(&push_url);

        if let Err(err) = self
            .git
            .run(&["push", push_url.as_str(), branch.as_str()])
            .await
        {
            let text = scrub(err.output(), &credential);
            warn!(%branch, remote = %redacted, output = %text, "push failed");
            return Err(match classify(Stage::Push, err.output()) {
                FailureKind::PushForbidden => PublishError::PushForbidden,
                _ => PublishError::PushFailed,
            });
        }

        info!(%branch, remote = %redacted, "published");
        Ok(PublishOutcome {
            branch,
            remote: redacted,
        })
    }

    fn resolve_credential(&self) -> Result<String, PublishError> {
        self.credentials
            .read()?
            .filter(|c| !c.is_empty())
            .or_else(|| self.fallback_credential.clone())
            .ok_or(PublishError::CredentialMissing)
    }

    /// Candidate targets under the active policy.
    fn apply_policy(&self, changed: &[String]) -> Result<Vec<String>, PublishError> {
        let list = &self.settings.allow_list;
        match self.settings.policy {
            AllowPolicy::RejectDisallowed => {
                let invalid = list.find_invalid_paths(changed);
                if !invalid.is_empty() {
                    warn!(invalid = ?invalid, "refusing disallowed changes");
                    return Err(PublishError::DisallowedChanges {
                        invalid_paths: unique_list(invalid),
                    });
                }
                Ok(list.touched_roots(changed))
            }
            AllowPolicy::KeepAllowed => {
                let allowed = list.allowed_paths(changed);
                if allowed.is_empty() {
                    return Err(PublishError::NoPublishableChanges);
                }
                Ok(allowed)
            }
        }
    }

    /// Normalize against the repository prefix and keep paths that exist
    /// on disk or are tracked by git (a tracked path missing from disk is a
    /// deletion to publish).
    async fn existing_targets(&self, candidates: Vec<String>) -> Result<Vec<String>, PublishError> {
        let prefix = self.git.run(&["rev-parse", "--show-prefix"]).await?;
        let prefix = prefix.trim();

        let normalized = candidates
            .iter()
            .map(|target| normalize_target(target, prefix))
            .filter(|target| !target.is_empty());

        let mut targets = Vec::new();
        for target in unique_list(normalized) {
            if self.exists(&target) || self.is_tracked(&target).await? {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    fn exists(&self, relative: &str) -> bool {
        self.site_root.join(Path::new(relative)).exists()
    }

    async fn is_tracked(&self, relative: &str) -> Result<bool, PublishError> {
        let listed = self.git.run(&["ls-files", "--", relative]).await?;
        Ok(!listed.trim().is_empty())
    }

    async fn commit(&self) -> Result<(), PublishError> {
        let message = format!(
            "{} {}",
            self.settings.commit_prefix,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        match self.git.run(&["commit", "-m", message.as_str()]).await {
            Ok(_) => Ok(()),
            Err(err) => match classify(Stage::Commit, err.output()) {
                FailureKind::NothingToCommit => Err(PublishError::NothingToCommit),
                _ => Err(PublishError::Git(err)),
            },
        }
    }

    async fn remote_url(&self) -> Result<String, PublishError> {
        let key = format!("remote.{}.url", self.settings.remote);
        let url = self
            .git
            .run(&["config", "--get", key.as_str()])
            .await
            .unwrap_or_default();

        if url.is_empty() {
            Err(PublishError::RemoteNotConfigured(self.settings.remote.clone()))
        } else {
            Ok(url)
        }
    }

    /// Discard local changes and pull from the remote.
    ///
    /// Uncommitted edits are lost. A failing step is reported as-is.
    pub async fn resync(&self) -> Result<(), PublishError> {
        self.git.run(&["reset", "--hard"]).await?;
        self.git.run(&["pull"]).await?;
        info!("working tree resynchronized");
        Ok(())
    }
}

/// Strip the repository prefix reported by git and a leading `./`.
pub fn normalize_target(target: &str, prefix: &str) -> String {
    let mut normalized = target;
    if !prefix.is_empty() {
        normalized = normalized.strip_prefix(prefix).unwrap_or(normalized);
    }
    normalized = normalized.strip_prefix("./").unwrap_or(normalized);
    normalized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockHost;
    use crate::forge::RepoSlug;
    use crate::git::ScriptedGit;
    use crate::secrets::EnvFileStore;
    use std::fs;
    use tempfile::TempDir;

    const REMOTE: &str = "git@github.com:acme/site.git";

    struct Fixture {
        site: TempDir,
        git: ScriptedGit,
        host: MockHost,
        credentials: Arc<CredentialStore>,
    }

    impl Fixture {
        fn new(git: ScriptedGit) -> Self {
            let site = TempDir::new().expect("temp");
            fs::create_dir_all(site.path().join("src/content/pages")).expect("mkdir");
            fs::create_dir_all(site.path().join("public/images")).expect("mkdir");
            let credentials = Arc::new(CredentialStore::new(
                Box::new(EnvFileStore::new(site.path().join(".env.local"))),
                "CMS_GITHUB_TOKEN",
            ));
            credentials.save("ghp_secret").expect("save");

            let slug = RepoSlug {
                owner: "acme".into(),
                name: "site".into(),
            };
            let host = MockHost::new()
                .with_user("ghp_secret", "editor")
                .with_collaborator(&slug, "editor");

            let git = git
                .respond("config --get remote.origin.url", REMOTE)
                .respond("rev-parse --abbrev-ref HEAD", "main");

            Self {
                site,
                git,
                host,
                credentials,
            }
        }

        fn publisher(&self, settings: PublishSettings) -> Publisher {
            let git: Arc<dyn GitRunner> = Arc::new(self.git.clone());
            let verifier = AccessVerifier::new(Arc::new(self.host.clone()), git.clone(), "origin");
            Publisher::new(
                git,
                self.credentials.clone(),
                verifier,
                self.site.path(),
                settings,
            )
        }

        fn assert_nothing_mutated(&self) {
            for sub in ["add", "commit", "push"] {
                assert!(!self.git.was_called(sub), "unexpected git {}", sub);
            }
        }
    }

    #[tokio::test]
    async fn publish_success() {
        let fx = Fixture::new(
            ScriptedGit::new().respond("status --porcelain", " M src/content/pages/index.json"),
        );

        let outcome = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .expect("publish");

        assert_eq!(outcome.branch, "main");
        assert_eq!(outcome.remote, "https://github.com/acme/site.git");

        assert_eq!(
            fx.git.call_of("add").expect("add"),
            vec!["add", "-A", "--", "src/content"]
        );
        let commit = fx.git.call_of("commit").expect("commit");
        assert!(commit[2].starts_with("CMS: update content "));
        assert_eq!(
            fx.git.call_of("push").expect("push"),
            vec!["push", "https://ghp_secret@github.com/acme/site.git", "main"]
        );
    }

    #[tokio::test]
    async fn missing_credential() {
        let fx = Fixture::new(ScriptedGit::new());
        fx.credentials.clear().expect("clear");

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::CredentialMissing));
        assert!(fx.git.calls().is_empty());
    }

    #[tokio::test]
    async fn fallback_credential_used_when_nothing_stored() {
        let fx = Fixture::new(
            ScriptedGit::new().respond("status --porcelain", "?? public/images/a.png"),
        );
        fx.credentials.clear().expect("clear");

        let outcome = fx
            .publisher(PublishSettings::default())
            .with_fallback_credential(Some("ghp_secret".into()))
            .publish()
            .await
            .expect("publish");

        assert_eq!(outcome.branch, "main");
    }

    #[tokio::test]
    async fn nothing_to_publish_stages_nothing() {
        let fx = Fixture::new(ScriptedGit::new().respond("status --porcelain", ""));

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::NothingToPublish));
        fx.assert_nothing_mutated();
    }

    #[tokio::test]
    async fn disallowed_changes_rejected_before_staging() {
        let fx = Fixture::new(ScriptedGit::new().respond(
            "status --porcelain",
            " M src/content/pages/index.json\n M package.json\n M package.json\n M .DS_Store",
        ));

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        match err {
            PublishError::DisallowedChanges { invalid_paths } => {
                assert_eq!(invalid_paths, vec!["package.json".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        fx.assert_nothing_mutated();
    }

    #[tokio::test]
    async fn keep_allowed_policy_drops_other_files() {
        let fx = Fixture::new(ScriptedGit::new().respond(
            "status --porcelain",
            " M package.json\n M src/content/pages/index.json\n M src/content/notes.txt",
        ));
        fs::write(fx.site.path().join("src/content/pages/index.json"), "{}").expect("write");
        fs::write(fx.site.path().join("src/content/notes.txt"), "x").expect("write");

        let settings = PublishSettings {
            policy: AllowPolicy::KeepAllowed,
            ..PublishSettings::default()
        };
        fx.publisher(settings).publish().await.expect("publish");

        assert_eq!(
            fx.git.call_of("add").expect("add"),
            vec!["add", "-A", "--", "src/content/pages/index.json"]
        );
    }

    #[tokio::test]
    async fn keep_allowed_policy_stages_tracked_deletions() {
        let fx = Fixture::new(
            ScriptedGit::new()
                .respond(
                    "status --porcelain",
                    " D src/content/pages/project/alpha.json\n?? src/content/pages/project/beta.json",
                )
                .respond(
                    "ls-files -- src/content/pages/project/alpha.json",
                    "src/content/pages/project/alpha.json",
                ),
        );
        fs::create_dir_all(fx.site.path().join("src/content/pages/project")).expect("mkdir");
        fs::write(
            fx.site.path().join("src/content/pages/project/beta.json"),
            r#"{"id": "beta"}"#,
        )
        .expect("write");

        let settings = PublishSettings {
            policy: AllowPolicy::KeepAllowed,
            ..PublishSettings::default()
        };
        fx.publisher(settings).publish().await.expect("publish");

        assert_eq!(
            fx.git.call_of("add").expect("add"),
            vec![
                "add",
                "-A",
                "--",
                "src/content/pages/project/alpha.json",
                "src/content/pages/project/beta.json"
            ]
        );
    }

    #[tokio::test]
    async fn keep_allowed_policy_with_nothing_allowed() {
        let fx = Fixture::new(ScriptedGit::new().respond("status --porcelain", " M package.json"));
        let settings = PublishSettings {
            policy: AllowPolicy::KeepAllowed,
            ..PublishSettings::default()
        };

        let err = fx.publisher(settings).publish().await.unwrap_err();

        assert!(matches!(err, PublishError::NoPublishableChanges));
        fx.assert_nothing_mutated();
    }

    #[tokio::test]
    async fn repository_prefix_is_stripped() {
        let fx = Fixture::new(
            ScriptedGit::new()
                .respond("status --porcelain", " M frontend/src/content/pages/index.json")
                .respond("rev-parse --show-prefix", "frontend/"),
        );

        fx.publisher(PublishSettings::default())
            .publish()
            .await
            .expect("publish");

        assert_eq!(
            fx.git.call_of("add").expect("add"),
            vec!["add", "-A", "--", "src/content"]
        );
    }

    #[tokio::test]
    async fn targets_missing_on_disk_are_not_publishable() {
        let fx = Fixture::new(
            ScriptedGit::new().respond("status --porcelain", " D frontend/public/old.png"),
        );

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::NoPublishableChanges));
        fx.assert_nothing_mutated();
    }

    #[tokio::test]
    async fn access_verified_before_staging() {
        let fx = Fixture::new(
            ScriptedGit::new().respond("status --porcelain", " M src/content/pages/index.json"),
        );
        fx.credentials.save("ghp_other").expect("save");

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublishError::Access(AuthError::InvalidCredential)
        ));
        fx.assert_nothing_mutated();
    }

    #[tokio::test]
    async fn nothing_to_commit_classified() {
        let fx = Fixture::new(
            ScriptedGit::new()
                .respond("status --porcelain", " M src/content/pages/index.json")
                .fail("commit", "On branch main\nnothing to commit, working tree clean"),
        );

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::NothingToCommit));
        assert!(!fx.git.was_called("push"));
    }

    #[tokio::test]
    async fn other_commit_failure_propagates() {
        let fx = Fixture::new(
            ScriptedGit::new()
                .respond("status --porcelain", " M src/content/pages/index.json")
                .fail("commit", "fatal: unable to auto-detect email address"),
        );

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Git(_)));
    }

    #[tokio::test]
    async fn missing_remote() {
        let fx = Fixture::new(
            ScriptedGit::new()
                .respond("status --porcelain", " M src/content/pages/index.json")
                .respond("config --get remote.upstream.url", ""),
        );
        let settings = PublishSettings {
            remote: "upstream".into(),
            verify_access: false,
            ..PublishSettings::default()
        };

        let err = fx.publisher(settings).publish().await.unwrap_err();

        assert!(matches!(err, PublishError::RemoteNotConfigured(ref r) if r == "upstream"));
        assert!(!fx.git.was_called("push"));
    }

    #[tokio::test]
    async fn push_permission_denied_is_forbidden() {
        let fx = Fixture::new(
            ScriptedGit::new()
                .respond("status --porcelain", " M src/content/pages/index.json")
                .fail(
                    "push",
                    "remote: Permission to acme/site.git denied to editor.\nfatal: unable to access 'https://ghp_secret@github.com/acme/site.git/'",
                ),
        );

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::PushForbidden));
        assert!(!err.to_string().contains("ghp_secret"));
    }

    #[tokio::test]
    async fn other_push_failure_is_generic() {
        let fx = Fixture::new(
            ScriptedGit::new()
                .respond("status --porcelain", " M src/content/pages/index.json")
                .fail(
                    "push",
                    "fatal: unable to access 'https://ghp_secret@github.com/acme/site.git/': Could not resolve host",
                ),
        );

        let err = fx
            .publisher(PublishSettings::default())
            .publish()
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::PushFailed));
        assert!(!format!("{:?}", err).contains("ghp_secret"));
    }

    #[tokio::test]
    async fn resync_resets_then_pulls() {
        let fx = Fixture::new(ScriptedGit::new());

        fx.publisher(PublishSettings::default())
            .resync()
            .await
            .expect("resync");

        let calls = fx.git.calls();
        assert_eq!(calls[0], vec!["reset", "--hard"]);
        assert_eq!(calls[1], vec!["pull"]);
    }

    #[test]
    fn normalize_strips_prefix_and_dot_slash() {
        assert_eq!(normalize_target("frontend/src/content", "frontend/"), "src/content");
        assert_eq!(normalize_target("./public", ""), "public");
        assert_eq!(normalize_target("public", "frontend/"), "public");
    }

    #[test]
    fn debug_hides_fallback_credential() {
        let fx = Fixture::new(ScriptedGit::new());
        let publisher = fx
            .publisher(PublishSettings::default())
            .with_fallback_credential(Some("ghp_fallback".into()));

        assert!(!format!("{:?}", publisher).contains("ghp_fallback"));
    }
}
