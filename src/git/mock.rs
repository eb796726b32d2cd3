//! git::mock
//!
//! Scripted git runner for deterministic testing.
//!
//! # Design
//!
//! Responses are matched against the space-joined argument list by prefix;
//! the first matching rule wins and unmatched commands succeed with empty
//! output. Every invocation is recorded so tests can assert which steps ran.
//!
//! # Example
//!
//! ```
//! use sitecms::git::{GitRunner, ScriptedGit};
//!
//! # tokio_test_block_on(async {
//! let git = ScriptedGit::new()
//!     .respond("status --porcelain", " M src/content/pages/index.json")
//!     .fail("push", "remote: Permission to acme/site.git denied");
//!
//! let out = git.run(&["status", "--porcelain"]).await.unwrap();
//! assert_eq!(out, "M src/content/pages/index.json");
//! assert!(git.run(&["push", "url", "main"]).await.is_err());
//! assert!(git.was_called("push"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::runner::{GitError, GitRunner};

#[derive(Debug, Clone)]
enum Outcome {
    Output(String),
    Failure(String),
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    outcome: Outcome,
}

#[derive(Debug, Default)]
struct Inner {
    rules: Vec<Rule>,
    calls: Vec<Vec<String>>,
}

/// Git runner that replays scripted outputs.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGit {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedGit {
    /// Create a runner where every command succeeds with no output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout` for commands starting with `prefix`.
    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.push_rule(prefix, Outcome::Output(stdout.to_string()))
    }

    /// Fail with `output` for commands starting with `prefix`.
    pub fn fail(self, prefix: &str, output: &str) -> Self {
        self.push_rule(prefix, Outcome::Failure(output.to_string()))
    }

    fn push_rule(self, prefix: &str, outcome: Outcome) -> Self {
        self.lock().rules.push(Rule {
            prefix: prefix.to_string(),
            outcome,
        });
        self
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.lock().calls.clone()
    }

    /// Whether any invocation used `subcommand` as its first argument.
    pub fn was_called(&self, subcommand: &str) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|call| call.first().map(String::as_str) == Some(subcommand))
    }

    /// Arguments of the first invocation of `subcommand`.
    pub fn call_of(&self, subcommand: &str) -> Option<Vec<String>> {
        self.lock()
            .calls
            .iter()
            .find(|call| call.first().map(String::as_str) == Some(subcommand))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl GitRunner for ScriptedGit {
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let joined = args.join(" ");
        let mut inner = self.lock();
        inner
            .calls
            .push(args.iter().map(|a| a.to_string()).collect());

        let outcome = inner
            .rules
            .iter()
            .find(|rule| joined.starts_with(&rule.prefix))
            .map(|rule| rule.outcome.clone());

        match outcome {
            Some(Outcome::Output(stdout)) => Ok(stdout.trim().to_string()),
            Some(Outcome::Failure(output)) => Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or("").to_string(),
                code: Some(1),
                output,
            }),
            None => Ok(String::new()),
        }
    }
}
