//! git
//!
//! The single doorway to git for the sidecar.
//!
//! # Architecture
//!
//! - [`GitRunner`]: async trait; everything that touches the repository goes
//!   through it
//! - [`SystemGit`]: shells out to the `git` binary with prompts disabled
//! - [`ScriptedGit`]: recorded, scripted runner for tests
//! - [`status`]: porcelain parsing and allow-list checks (pure functions)
//!
//! # Example
//!
//! ```ignore
//! use sitecms::git::{GitRunner, SystemGit};
//!
//! let git = SystemGit::new("/srv/site");
//! let branch = git.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
//! ```

pub mod mock;
pub mod runner;
pub mod status;

pub use mock::ScriptedGit;
pub use runner::{GitError, GitRunner, SystemGit};
pub use status::{
    extract_changed_paths, unique_list, AllowList, AllowPolicy, DEFAULT_EXTENSIONS,
    DEFAULT_ROOTS, NOISE_FILENAME,
};
