//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run against the site checkout at that path
//! - `--config <path>`: Use this global config file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// sitecms - content publish sidecar for static sites
#[derive(Parser, Debug)]
#[command(name = "sitecms")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if sitecms was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Global configuration file (overrides the default search)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; disables prompts
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Prompts are allowed when not quiet and stdin is a terminal.
    pub fn interactive(&self) -> bool {
        !self.quiet && std::io::stdin().is_terminal()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the CMS HTTP server
    #[command(
        name = "serve",
        long_about = "Run the CMS HTTP server.\n\n\
            Serves the /api/cms endpoints for the site checkout in the current \
            directory (or --cwd). The editor UI talks to these endpoints to save \
            credentials, edit content and publish.",
        after_help = "\
EXAMPLES:
    # Serve on the configured address (default 127.0.0.1:3001)
    sitecms serve

    # Serve another checkout on a custom port
    sitecms --cwd /srv/site serve --bind 127.0.0.1:4000"
    )]
    Serve {
        /// Listen address (overrides [server] bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Store, check or remove the GitHub credential
    #[command(
        name = "auth",
        long_about = "Store, check or remove the GitHub credential.\n\n\
            The credential is verified against GitHub before it is stored: it must \
            belong to a collaborator on the site repository. It is kept in the \
            site's key file (default .env.local) and never printed.",
        after_help = "\
EXAMPLES:
    # Prompt for the token (input is hidden)
    sitecms auth

    # Non-interactive
    sitecms auth --token \"$TOKEN\"

    # Check status
    sitecms auth --status

    # Remove the stored token
    sitecms auth --logout"
    )]
    Auth {
        /// Token to store (prompted for when omitted)
        #[arg(long, conflicts_with_all = ["status", "logout"])]
        token: Option<String>,

        /// Show current authentication status
        #[arg(long, conflicts_with = "logout")]
        status: bool,

        /// Remove stored authentication
        #[arg(long)]
        logout: bool,
    },

    /// Commit and push pending content changes
    #[command(
        name = "publish",
        long_about = "Commit and push pending content changes.\n\n\
            Validates the change set against the configured allow-list, stages \
            the allowed content, commits it and pushes the current branch with \
            the stored credential."
    )]
    Publish,

    /// Discard local changes and pull from the remote
    #[command(
        name = "resync",
        long_about = "Discard local changes and pull from the remote.\n\n\
            Runs `git reset --hard` followed by `git pull`. Uncommitted edits \
            are lost."
    )]
    Resync {
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Generate shell completion scripts
    #[command(name = "completion")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
