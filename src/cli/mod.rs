//! cli
//!
//! Command-line interface layer for sitecms.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve the site checkout and load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers build the same services the HTTP server
//! uses (see [`crate::server::AppState`]) so a publish from the terminal and
//! a publish from the editor go through identical code.

pub mod args;
pub mod commands;

pub use args::{Cli, Command, Shell};

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::ui::output::Verbosity;

/// Per-invocation settings shared by every command handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// Site checkout root override (`--cwd`)
    pub cwd: Option<PathBuf>,
    /// Global config file override (`--config`)
    pub config: Option<PathBuf>,
    /// Debug output enabled
    pub debug: bool,
    /// Minimal output
    pub quiet: bool,
    /// Prompts allowed
    pub interactive: bool,
}

impl Context {
    /// Build a context from parsed flags.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            cwd: cli.cwd.clone(),
            config: cli.config.clone(),
            debug: cli.debug,
            quiet: cli.quiet,
            interactive: cli.interactive(),
        }
    }

    /// Output verbosity from the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// The site checkout root: `--cwd` or the process working directory.
    pub fn site_root(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(path) => absolute(path),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let base = std::env::current_dir().context("cannot determine current directory")?;
    Ok(base.join(path))
}

/// Run the CLI application with an already parsed command line.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli);
    commands::dispatch(cli.command, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn context_from_flags() {
        let cli = Cli::try_parse_from(["sitecms", "--debug", "--cwd", "/srv/site", "publish"])
            .expect("parse");
        let ctx = Context::from_cli(&cli);

        assert!(ctx.debug);
        assert_eq!(ctx.verbosity(), Verbosity::Debug);
        assert_eq!(ctx.site_root().unwrap(), PathBuf::from("/srv/site"));
    }

    #[test]
    fn relative_cwd_is_made_absolute() {
        let ctx = Context {
            cwd: Some(PathBuf::from("site")),
            config: None,
            debug: false,
            quiet: true,
            interactive: false,
        };

        let root = ctx.site_root().unwrap();
        assert!(root.is_absolute());
        assert!(root.ends_with("site"));
    }
}
