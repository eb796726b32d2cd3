//! sitecms - content publish sidecar for static sites
//!
//! sitecms runs next to a static site's working copy. An editor UI calls its
//! HTTP endpoints to store a GitHub credential, rewrite JSON content and
//! publish the result: the allowed content changes are committed and pushed
//! to the site repository with that credential.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface (`serve`, `auth`, `publish`, `resync`)
//! - [`server`] - axum router for `/api/cms/*` and error rendering
//! - [`publish`] - Change classification, remote URL handling and the publish pipeline
//! - [`content`] - Locale registry and project listing writers
//! - [`auth`] - Identity and collaborator verification against the host
//! - [`forge`] - Source-control host API (GitHub)
//! - [`git`] - Subprocess git runner
//! - [`secrets`] - Credential persistence in the site key file
//! - [`core`] - Configuration, site paths and the working-tree lock
//! - [`ui`] - Terminal output and prompts
//!
//! # Invariants
//!
//! 1. Only paths under the allowed content roots are ever staged
//! 2. The credential never appears in responses, errors or logs
//! 3. Every mutation of the working tree holds the working-tree lock

pub mod auth;
pub mod cli;
pub mod content;
pub mod core;
pub mod forge;
pub mod git;
pub mod publish;
pub mod secrets;
pub mod server;
pub mod ui;
