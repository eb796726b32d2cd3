//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves the site checkout and configuration
//! 2. Builds the services it needs
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that talk to GitHub or serve HTTP are async. The dispatch
//! function is sync, so each such handler starts its own tokio runtime.

mod auth;
mod completion;
mod publish;
mod serve;

pub use auth::auth;
pub use completion::completion;
pub use publish::{publish, resync};
pub use serve::serve;

use anyhow::{bail, Result};

use super::args::Command;
use super::Context;
use crate::core::config::Config;
use crate::core::paths::SitePaths;
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Serve { bind } => serve(ctx, bind),
        Command::Auth {
            token,
            status,
            logout,
        } => auth(ctx, token.as_deref(), status, logout),
        Command::Publish => publish(ctx),
        Command::Resync { yes } => resync(ctx, yes),
        Command::Completion { shell } => completion(shell),
    }
}

/// Resolve the site checkout and load its configuration.
///
/// Config warnings are printed here so every command reports them the same
/// way.
pub(crate) fn load_site(ctx: &Context) -> Result<(SitePaths, Config)> {
    let root = ctx.site_root()?;
    let paths = SitePaths::discover(&root);

    let loaded = Config::load(Some(&paths), ctx.config.as_deref())?;
    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            ctx.verbosity(),
        );
    }

    let config = loaded.config;
    if let Some(path) = config.global_config_loaded_from() {
        tracing::debug!(path = %path.display(), "loaded global config");
    }
    if let Some(path) = config.site_config_loaded_from() {
        tracing::debug!(path = %path.display(), "loaded site config");
    }

    Ok((paths, config))
}

/// Fail unless the site root is a git checkout.
///
/// Checked before anything is written under the git dir.
pub(crate) fn require_repository(paths: &SitePaths) -> Result<()> {
    if !paths.git_dir.is_dir() {
        bail!("{} is not a git repository", paths.root.display());
    }
    Ok(())
}

/// A current-thread runtime for one command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
