//! core::paths
//!
//! Centralized path routing for site storage locations.
//!
//! # Storage Layout
//!
//! Content lives under `<site>/<content dir>/`:
//! - `locales.json` - Locale registry
//! - `pages/index.json` - Content index with the translation template
//! - `pages/projects.json` - Project listing
//! - `pages/project/<slug>.json` - One document per project
//!
//! Sidecar state lives under `<git dir>/sitecms/`, so it never shows up in
//! `git status`:
//! - `config.toml` - Site configuration
//! - `lock` - Exclusive working-tree lock
//!
//! # Example
//!
//! ```
//! use sitecms::core::paths::SitePaths;
//! use std::path::PathBuf;
//!
//! let paths = SitePaths::new(PathBuf::from("/srv/site"), PathBuf::from("/srv/site/.git"));
//!
//! assert_eq!(
//!     paths.lock_path(),
//!     PathBuf::from("/srv/site/.git/sitecms/lock")
//! );
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

/// Default content directory, relative to the site root.
pub const DEFAULT_CONTENT_DIR: &str = "src/content";

/// Resolved storage locations for one site checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    /// Working tree root.
    pub root: PathBuf,
    /// Git directory of the working tree.
    pub git_dir: PathBuf,
    content_dir: PathBuf,
}

impl SitePaths {
    /// Create paths with the default content directory.
    pub fn new(root: PathBuf, git_dir: PathBuf) -> Self {
        let content_dir = root.join(DEFAULT_CONTENT_DIR);
        Self {
            root,
            git_dir,
            content_dir,
        }
    }

    /// Resolve paths for `root`, asking git where its directory lives.
    ///
    /// Falls back to `<root>/.git` when git is unavailable or `root` is not
    /// a repository yet.
    pub fn discover(root: &Path) -> Self {
        let git_dir = discover_git_dir(root).unwrap_or_else(|| root.join(".git"));
        Self::new(root.to_path_buf(), git_dir)
    }

    /// Use `dir` (relative to the root, or absolute) as the content directory.
    pub fn with_content_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.content_dir = self.root.join(dir);
        self
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Content directory.
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// `<content>/locales.json`
    pub fn locales_path(&self) -> PathBuf {
        self.content_dir.join("locales.json")
    }

    /// `<content>/pages/index.json`
    pub fn index_path(&self) -> PathBuf {
        self.content_dir.join("pages").join("index.json")
    }

    /// `<content>/pages/projects.json`
    pub fn projects_path(&self) -> PathBuf {
        self.content_dir.join("pages").join("projects.json")
    }

    /// `<content>/pages/project/`
    pub fn project_dir(&self) -> PathBuf {
        self.content_dir.join("pages").join("project")
    }

    // =========================================================================
    // Sidecar state
    // =========================================================================

    /// `<git dir>/sitecms/`
    pub fn state_dir(&self) -> PathBuf {
        self.git_dir.join("sitecms")
    }

    /// `<git dir>/sitecms/config.toml`
    pub fn site_config_path(&self) -> PathBuf {
        self.state_dir().join("config.toml")
    }

    /// `<git dir>/sitecms/lock`
    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("lock")
    }

    /// Resolve a site-relative path (absolute paths are returned unchanged).
    pub fn site_file(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

/// Ask git for the absolute git directory of the checkout at `root`.
pub fn discover_git_dir(root: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--absolute-git-dir"])
        .current_dir(root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!dir.is_empty()).then(|| PathBuf::from(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> SitePaths {
        SitePaths::new(PathBuf::from("/srv/site"), PathBuf::from("/srv/site/.git"))
    }

    #[test]
    fn content_paths() {
        let p = paths();
        assert_eq!(p.locales_path(), PathBuf::from("/srv/site/src/content/locales.json"));
        assert_eq!(
            p.index_path(),
            PathBuf::from("/srv/site/src/content/pages/index.json")
        );
        assert_eq!(
            p.projects_path(),
            PathBuf::from("/srv/site/src/content/pages/projects.json")
        );
        assert_eq!(
            p.project_dir(),
            PathBuf::from("/srv/site/src/content/pages/project")
        );
    }

    #[test]
    fn custom_content_dir() {
        let p = paths().with_content_dir("frontend/src/content");
        assert_eq!(
            p.locales_path(),
            PathBuf::from("/srv/site/frontend/src/content/locales.json")
        );
    }

    #[test]
    fn state_lives_in_git_dir() {
        let p = paths();
        assert_eq!(
            p.site_config_path(),
            PathBuf::from("/srv/site/.git/sitecms/config.toml")
        );
        assert_eq!(p.lock_path(), PathBuf::from("/srv/site/.git/sitecms/lock"));
    }

    #[test]
    fn site_file_resolves_relative() {
        assert_eq!(
            paths().site_file(".env.local"),
            PathBuf::from("/srv/site/.env.local")
        );
        assert_eq!(
            paths().site_file("/etc/sitecms.env"),
            PathBuf::from("/etc/sitecms.env")
        );
    }

    #[test]
    fn discover_outside_repository_falls_back() {
        let dir = tempfile::TempDir::new().expect("temp");
        let p = SitePaths::discover(dir.path());
        assert_eq!(p.git_dir, dir.path().join(".git"));
    }
}
