//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The sidecar has two configuration scopes:
//! - **Global**: operator-level settings shared by every site
//! - **Site**: per-checkout overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Site config file
//! 4. CLI flags (applied by the caller through the `with_*` methods)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `--config <path>` if given (must exist)
//! 2. `$SITECMS_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/sitecms/config.toml`
//! 4. `~/.sitecms/config.toml`
//!
//! # Site Config Location
//!
//! `<git dir>/sitecms/config.toml`, inside the git dir so it is never part
//! of a change set.
//!
//! # Example
//!
//! ```no_run
//! use sitecms::core::config::Config;
//! use sitecms::core::paths::SitePaths;
//! use std::path::Path;
//!
//! let paths = SitePaths::discover(Path::new("/srv/site"));
//! let result = Config::load(Some(&paths), None).unwrap();
//! let config = result.config;
//!
//! println!("Remote: {}", config.remote());
//! println!("Listening on: {}", config.bind_addr());
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::paths::{SitePaths, DEFAULT_CONTENT_DIR};
use crate::forge::github::{DEFAULT_API_BASE, DEFAULT_USER_AGENT};
use crate::git::{AllowList, AllowPolicy, DEFAULT_EXTENSIONS, DEFAULT_ROOTS};
use crate::publish::PublishSettings;
use crate::secrets::DEFAULT_CREDENTIAL_KEY;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default credential key file, relative to the site root.
pub const DEFAULT_CREDENTIAL_FILE: &str = ".env.local";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence field by field: a site value wins over a
/// global value, which wins over the default.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: FileConfig,
    /// Site configuration (if present)
    pub site: Option<FileConfig>,
    global_path: Option<PathBuf>,
    site_path: Option<PathBuf>,
    bind_override: Option<SocketAddr>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// `explicit` names a global file that must exist (from `--config`).
    /// If `site` is provided, its site config is layered on top.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or
    /// fail validation. Missing config files are not an error.
    pub fn load(
        site: Option<&SitePaths>,
        explicit: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match explicit {
            Some(path) => (Self::read_file(path)?, Some(path.to_path_buf())),
            None => Self::load_global(&mut warnings)?,
        };

        let (site_config, site_path) = match site {
            Some(paths) => {
                let path = paths.site_config_path();
                if path.exists() {
                    (Some(Self::read_file(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref s) = site_config {
            s.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                site: site_config,
                global_path,
                site_path,
                bind_override: None,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global(
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        // 1. $SITECMS_CONFIG
        if let Ok(path) = std::env::var("SITECMS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
            warnings.push(ConfigWarning {
                message: "SITECMS_CONFIG points to a missing file, ignoring it".to_string(),
                path,
            });
        }

        // 2. $XDG_CONFIG_HOME/sitecms/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("sitecms/config.toml");
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. ~/.sitecms/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".sitecms/config.toml");
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((FileConfig::default(), None))
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Override the listen address (from `serve --bind`).
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind_override = Some(bind);
        self
    }

    /// Site value if set, else global value.
    fn pick<T>(&self, get: impl Fn(&FileConfig) -> Option<T>) -> Option<T> {
        self.site.as_ref().and_then(&get).or_else(|| get(&self.global))
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Listen address.
    ///
    /// Defaults to `127.0.0.1:3001`.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_override
            .or_else(|| {
                self.pick(|c| c.server.as_ref()?.bind.clone())
                    .and_then(|b| b.parse().ok())
            })
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))
    }

    /// Credential key name.
    ///
    /// Defaults to `CMS_GITHUB_TOKEN`.
    pub fn credential_key(&self) -> String {
        self.pick(|c| c.credentials.as_ref()?.key.clone())
            .unwrap_or_else(|| DEFAULT_CREDENTIAL_KEY.to_string())
    }

    /// Credential key file, relative to the site root.
    ///
    /// Defaults to `.env.local`.
    pub fn credential_file(&self) -> String {
        self.pick(|c| c.credentials.as_ref()?.file.clone())
            .unwrap_or_else(|| DEFAULT_CREDENTIAL_FILE.to_string())
    }

    /// Whether publish may fall back to the environment.
    ///
    /// Defaults to `true`.
    pub fn env_fallback(&self) -> bool {
        self.pick(|c| c.credentials.as_ref()?.env_fallback)
            .unwrap_or(true)
    }

    /// Host API base URL.
    pub fn api_base(&self) -> String {
        self.pick(|c| c.host.as_ref()?.api_base.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    /// User-Agent for host API calls.
    pub fn user_agent(&self) -> String {
        self.pick(|c| c.host.as_ref()?.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    /// Remote name.
    ///
    /// Defaults to "origin".
    pub fn remote(&self) -> String {
        self.pick(|c| c.publish.as_ref()?.remote.clone())
            .unwrap_or_else(|| "origin".to_string())
    }

    /// Allow-list policy.
    pub fn policy(&self) -> AllowPolicy {
        self.pick(|c| c.publish.as_ref()?.policy).unwrap_or_default()
    }

    /// Allow-list roots and extensions.
    pub fn allow_list(&self) -> AllowList {
        let roots = self
            .pick(|c| c.publish.as_ref()?.roots.clone())
            .unwrap_or_else(|| DEFAULT_ROOTS.iter().map(|r| r.to_string()).collect());
        let extensions = self
            .pick(|c| c.publish.as_ref()?.extensions.clone())
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect());
        AllowList::new(roots, extensions)
    }

    /// Whether publish re-verifies collaborator access.
    ///
    /// Defaults to `true`.
    pub fn verify_access(&self) -> bool {
        self.pick(|c| c.publish.as_ref()?.verify_access)
            .unwrap_or(true)
    }

    /// Commit message prefix.
    pub fn commit_prefix(&self) -> String {
        self.pick(|c| c.publish.as_ref()?.commit_prefix.clone())
            .unwrap_or_else(|| PublishSettings::default().commit_prefix)
    }

    /// Content directory, relative to the site root.
    pub fn content_dir(&self) -> String {
        self.pick(|c| c.content.as_ref()?.dir.clone())
            .unwrap_or_else(|| DEFAULT_CONTENT_DIR.to_string())
    }

    /// Publish settings assembled from the `[publish]` keys.
    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            remote: self.remote(),
            policy: self.policy(),
            allow_list: self.allow_list(),
            verify_access: self.verify_access(),
            commit_prefix: self.commit_prefix(),
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded site config file.
    pub fn site_config_loaded_from(&self) -> Option<&Path> {
        self.site_path.as_deref()
    }
}
