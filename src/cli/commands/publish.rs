//! publish and resync commands

use anyhow::{bail, Result};

use super::{load_site, require_repository, runtime};
use crate::cli::Context;
use crate::core::ops::WorktreeLock;
use crate::publish::PublishError;
use crate::server::AppState;
use crate::ui::{output, prompts};

/// Commit and push pending content changes.
pub fn publish(ctx: &Context) -> Result<()> {
    let (paths, config) = load_site(ctx)?;
    require_repository(&paths)?;
    let _lock = WorktreeLock::acquire(&paths)?;
    let state = AppState::from_config(paths, &config);

    let rt = runtime()?;
    match rt.block_on(state.publisher.publish()) {
        Ok(outcome) => {
            output::print(
                format!("Pushed {} to {}.", outcome.branch, outcome.remote),
                ctx.verbosity(),
            );
            Ok(())
        }
        Err(PublishError::DisallowedChanges { invalid_paths }) => {
            output::error("changes outside the allowed content roots:");
            eprintln!("{}", output::format_list(&invalid_paths, "  - "));
            bail!("refusing to publish");
        }
        Err(PublishError::CredentialMissing) => {
            bail!("no GitHub token stored. Run 'sitecms auth' first.")
        }
        Err(e) => Err(e.into()),
    }
}

/// Discard local changes and pull.
pub fn resync(ctx: &Context, yes: bool) -> Result<()> {
    let (paths, config) = load_site(ctx)?;
    require_repository(&paths)?;

    if !yes {
        let confirmed = prompts::confirm(
            "Discard all uncommitted changes and pull?",
            false,
            ctx.interactive,
        )
        .map_err(|_| anyhow::anyhow!("confirmation required. Use --yes to skip the prompt."))?;
        if !confirmed {
            output::print("Aborted.", ctx.verbosity());
            return Ok(());
        }
    }

    let _lock = WorktreeLock::acquire(&paths)?;
    let state = AppState::from_config(paths, &config);

    runtime()?.block_on(state.publisher.resync())?;
    output::print("Working tree reset and pulled.", ctx.verbosity());
    Ok(())
}
