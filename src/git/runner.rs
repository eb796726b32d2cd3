//! git::runner
//!
//! Subprocess runner for the system `git` binary.
//!
//! Every call runs in the site working directory with
//! `GIT_TERMINAL_PROMPT=0`, so an authentication failure surfaces as an
//! error instead of blocking on a credential prompt. Stdout is returned
//! trimmed; a non-zero exit becomes [`GitError::CommandFailed`] carrying the
//! raw tool output. Callers classify failures by matching that text because
//! git has no machine-readable codes for them.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Errors from running git.
///
/// Only the subcommand name is recorded, never the full argument list: push
/// arguments can carry a credential-bearing URL.
#[derive(Debug, Clone, Error)]
pub enum GitError {
    /// The git binary could not be started.
    #[error("failed to run git {command}: {message}")]
    Spawn {
        /// Subcommand that was attempted
        command: String,
        /// OS error description
        message: String,
    },

    /// git exited with a non-zero status.
    #[error("git {command} failed: {output}")]
    CommandFailed {
        /// Subcommand that failed
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Raw stderr followed by stdout, trimmed
        output: String,
    },
}

impl GitError {
    /// The raw failure text used for substring classification.
    pub fn output(&self) -> &str {
        match self {
            GitError::Spawn { message, .. } => message,
            GitError::CommandFailed { output, .. } => output,
        }
    }
}

/// Something that can run git commands.
///
/// The publish pipeline only talks to git through this trait so the
/// orchestration can be driven by [`ScriptedGit`](super::ScriptedGit) in tests.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` and return trimmed stdout.
    async fn run(&self, args: &[&str]) -> Result<String, GitError>;
}

/// Runs the real git binary.
#[derive(Debug, Clone)]
pub struct SystemGit {
    binary: PathBuf,
    workdir: PathBuf,
}

impl SystemGit {
    /// Run `git` from `PATH` inside `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from("git"),
            workdir: workdir.into(),
        }
    }

    /// Use a specific git binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    #[instrument(skip_all, fields(command = args.first().copied().unwrap_or("")))]
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let command = args.first().copied().unwrap_or("").to_string();

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GitError::Spawn {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = format!("{}\n{}", stderr.trim(), stdout.trim());
            debug!(code = ?output.status.code(), "git command failed");
            return Err(GitError::CommandFailed {
                command,
                code: output.status.code(),
                output: combined.trim().to_string(),
            });
        }

        debug!("git command succeeded");
        Ok(stdout.trim().to_string())
    }
}
