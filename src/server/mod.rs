//! server
//!
//! HTTP surface of the sidecar.
//!
//! # Architecture
//!
//! - [`AppState`]: every service a handler needs, shared behind an `Arc`
//! - [`routes`]: axum router and handlers
//! - [`error`]: domain errors rendered as JSON responses
//!
//! The state is built once from [`Config`] and never mutated afterwards;
//! the only process-wide mutable pieces are the credential mirror inside
//! [`CredentialStore`] and the working tree itself (guarded by
//! [`WorktreeLock`](crate::core::ops::WorktreeLock)).

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::signal;
use tracing::{info, warn};

use crate::auth::AccessVerifier;
use crate::content::{LocaleRegistryWriter, ProjectRegistry};
use crate::core::config::Config;
use crate::core::paths::SitePaths;
use crate::forge::{GitHubHost, Host};
use crate::git::{GitRunner, SystemGit};
use crate::publish::{PublishSettings, Publisher};
use crate::secrets::{CredentialStore, EnvFileStore};

/// Shared handler state.
#[derive(Debug)]
pub struct AppState {
    pub paths: SitePaths,
    pub credentials: Arc<CredentialStore>,
    pub verifier: AccessVerifier,
    pub publisher: Publisher,
    pub locales: LocaleRegistryWriter,
    pub projects: ProjectRegistry,
}

impl AppState {
    /// Assemble the state from its collaborators.
    pub fn new(
        paths: SitePaths,
        credentials: Arc<CredentialStore>,
        host: Arc<dyn Host>,
        git: Arc<dyn GitRunner>,
        settings: PublishSettings,
    ) -> Self {
        let verifier = AccessVerifier::new(host, git.clone(), settings.remote.clone());
        let publisher = Publisher::new(
            git,
            credentials.clone(),
            verifier.clone(),
            paths.root.clone(),
            settings,
        );

        Self {
            locales: LocaleRegistryWriter::new(&paths),
            projects: ProjectRegistry::new(&paths),
            paths,
            credentials,
            verifier,
            publisher,
        }
    }

    /// Production wiring: key file store, GitHub API, system git.
    pub fn from_config(paths: SitePaths, config: &Config) -> Self {
        let paths = paths.with_content_dir(config.content_dir());
        let key = config.credential_key();

        let store = EnvFileStore::new(paths.site_file(config.credential_file()));
        let credentials = Arc::new(CredentialStore::new(Box::new(store), key.clone()));
        let host = GitHubHost::with_api_base(config.api_base()).user_agent(config.user_agent());
        let git = SystemGit::new(paths.root.clone());

        let fallback = if config.env_fallback() {
            std::env::var(&key).ok()
        } else {
            None
        };

        let mut state = Self::new(
            paths,
            credentials,
            Arc::new(host),
            Arc::new(git),
            config.publish_settings(),
        );
        state.publisher = state.publisher.with_fallback_credential(fallback);
        state
    }
}

/// Serve the router on `addr` until SIGINT or SIGTERM.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;

    info!(%addr, "sitecms listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
