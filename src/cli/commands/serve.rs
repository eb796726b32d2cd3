//! serve command - Run the CMS HTTP server

use std::net::SocketAddr;

use anyhow::{Context as _, Result};

use super::load_site;
use crate::cli::Context;
use crate::server::{self, AppState};

/// Serve the `/api/cms` endpoints until interrupted.
pub fn serve(ctx: &Context, bind: Option<SocketAddr>) -> Result<()> {
    let (paths, mut config) = load_site(ctx)?;
    if let Some(addr) = bind {
        config = config.with_bind(addr);
    }

    let addr = config.bind_addr();
    tracing::info!(root = %paths.root.display(), "serving site checkout");

    let state = AppState::from_config(paths, &config);
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    rt.block_on(server::serve(state, addr))
}
