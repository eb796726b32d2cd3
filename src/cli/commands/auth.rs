//! cli::commands::auth
//!
//! Store, check or remove the GitHub credential from the terminal.
//!
//! # Design
//!
//! The command goes through the same [`CredentialStore`] and
//! [`AccessVerifier`](crate::auth::AccessVerifier) as `/api/cms/auth`:
//! - a new token is verified against the site repository before it is saved
//! - the token value is NEVER printed, only the login it belongs to
//!
//! # Example
//!
//! ```bash
//! # Interactive (prompts for token)
//! sitecms auth
//!
//! # Non-interactive
//! sitecms auth --token ghp_xxxx
//!
//! # Check status
//! sitecms auth --status
//!
//! # Remove stored token
//! sitecms auth --logout
//! ```

use anyhow::{bail, Context as _, Result};

use super::{load_site, runtime};
use crate::cli::Context;
use crate::secrets::CredentialStore;
use crate::server::AppState;
use crate::ui::{output, prompts};

/// Run the auth command.
///
/// # Security
///
/// This function NEVER prints the token value. It only confirms success/failure.
pub fn auth(ctx: &Context, token: Option<&str>, status: bool, logout: bool) -> Result<()> {
    let (paths, config) = load_site(ctx)?;
    let state = AppState::from_config(paths, &config);

    if status {
        return show_status(&state.credentials, ctx);
    }

    if logout {
        return do_logout(&state.credentials, ctx);
    }

    let token = get_token(ctx, token)?;

    let rt = runtime()?;
    let identity = rt
        .block_on(state.verifier.verify_credential(&token))
        .context("token rejected")?;

    state
        .credentials
        .save(&token)
        .context("failed to store token")?;

    output::print(
        format!("Authenticated as {}.", identity.login),
        ctx.verbosity(),
    );
    Ok(())
}

/// Show authentication status.
fn show_status(credentials: &CredentialStore, ctx: &Context) -> Result<()> {
    let exists = credentials
        .read()
        .context("failed to read credential store")?
        .is_some();

    if ctx.quiet {
        // Machine-readable output
        println!("{}", if exists { "authenticated" } else { "not_authenticated" });
    } else if exists {
        println!("A GitHub token is stored under {}.", credentials.key());
    } else {
        println!("No GitHub token stored.");
        println!("Run 'sitecms auth' to store one.");
    }

    Ok(())
}

/// Remove stored authentication.
fn do_logout(credentials: &CredentialStore, ctx: &Context) -> Result<()> {
    credentials
        .clear()
        .context("failed to remove stored token")?;

    output::print("Stored GitHub token removed.", ctx.verbosity());
    Ok(())
}

/// Get token from argument or interactive prompt.
fn get_token(ctx: &Context, token_arg: Option<&str>) -> Result<String> {
    let token = match token_arg {
        Some(t) => t.trim().to_string(),
        None => {
            if !ctx.interactive {
                bail!("Token required. Use --token <TOKEN> or run interactively.");
            }
            prompts::password("GitHub Personal Access Token", ctx.interactive)?
        }
    };

    if token.is_empty() {
        bail!("Token is required.");
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context {
            cwd: None,
            config: None,
            debug: false,
            quiet: true,
            interactive: false,
        }
    }

    #[test]
    fn token_flag_is_trimmed() {
        assert_eq!(get_token(&ctx(), Some("  ghp_abc \n")).unwrap(), "ghp_abc");
    }

    #[test]
    fn blank_token_rejected() {
        let err = get_token(&ctx(), Some("   ")).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn missing_token_without_terminal_fails() {
        let err = get_token(&ctx(), None).unwrap_err();
        assert!(err.to_string().contains("--token"));
    }
}
