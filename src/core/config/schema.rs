//! core::config::schema
//!
//! Configuration schema types.
//!
//! The same schema is used for the global file and the site file; every
//! field is optional so a file only needs to name what it overrides.
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3001"
//!
//! [credentials]
//! key = "CMS_GITHUB_TOKEN"
//! file = ".env.local"
//!
//! [publish]
//! remote = "origin"
//! policy = "reject-disallowed"
//! roots = ["public/", "src/content/"]
//! ```
//!
//! # Validation
//!
//! Values are checked after parsing: roots end with `/`, extensions start
//! with `.`, and `bind` is a socket address.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::git::AllowPolicy;

/// One configuration file (global or site scope).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// HTTP listener
    pub server: Option<ServerSection>,

    /// Credential storage
    pub credentials: Option<CredentialsSection>,

    /// Source-control host API
    pub host: Option<HostSection>,

    /// Publish pipeline
    pub publish: Option<PublishSection>,

    /// Content layout
    pub content: Option<ContentSection>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bind) = self.server.as_ref().and_then(|s| s.bind.as_ref()) {
            bind.parse::<SocketAddr>().map_err(|_| {
                ConfigError::InvalidValue(format!("invalid bind address '{}'", bind))
            })?;
        }

        if let Some(credentials) = &self.credentials {
            credentials.validate()?;
        }

        if let Some(publish) = &self.publish {
            publish.validate()?;
        }

        Ok(())
    }
}

/// `[server]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Listen address (default: "127.0.0.1:3001")
    pub bind: Option<String>,
}

/// `[credentials]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsSection {
    /// Key name in the key file and the environment
    pub key: Option<String>,

    /// Key file, relative to the site root
    pub file: Option<String>,

    /// Fall back to the environment variable `key` when nothing is stored
    pub env_fallback: Option<bool>,
}

impl CredentialsSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.key {
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid credential key '{}': use letters, digits and '_'",
                    key
                )));
            }
        }

        if let Some(file) = &self.file {
            if file.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "credential file cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// `[host]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HostSection {
    /// API base URL (default: "https://api.github.com")
    pub api_base: Option<String>,

    /// User-Agent header sent with every API call
    pub user_agent: Option<String>,
}

/// `[publish]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSection {
    /// Remote name (default: "origin")
    pub remote: Option<String>,

    /// Allow-list policy
    pub policy: Option<AllowPolicy>,

    /// Allowed content roots, each ending with '/'
    pub roots: Option<Vec<String>>,

    /// Allowed extensions for `keep-allowed`, each starting with '.'
    pub extensions: Option<Vec<String>>,

    /// Re-verify collaborator access before staging
    pub verify_access: Option<bool>,

    /// Commit message prefix
    pub commit_prefix: Option<String>,
}

impl PublishSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            if remote.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote cannot be empty".to_string(),
                ));
            }
        }

        if let Some(roots) = &self.roots {
            if roots.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "publish roots cannot be empty".to_string(),
                ));
            }
            if let Some(bad) = roots.iter().find(|r| r.len() < 2 || !r.ends_with('/')) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid publish root '{}': must be a directory ending with '/'",
                    bad
                )));
            }
        }

        if let Some(extensions) = &self.extensions {
            if let Some(bad) = extensions
                .iter()
                .find(|e| e.len() < 2 || !e.starts_with('.'))
            {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid extension '{}': must start with '.'",
                    bad
                )));
            }
        }

        Ok(())
    }
}

/// `[content]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ContentSection {
    /// Content directory, relative to the site root
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish(section: PublishSection) -> FileConfig {
        FileConfig {
            publish: Some(section),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_full_file() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:8080"

            [credentials]
            key = "SITE_TOKEN"
            env_fallback = false

            [publish]
            policy = "keep-allowed"
            roots = ["content/"]
            extensions = [".md"]

            [content]
            dir = "content"
        "#;

        let config: FileConfig = toml::from_str(toml).expect("parse");
        config.validate().expect("valid");

        let publish = config.publish.expect("publish section");
        assert_eq!(publish.policy, Some(AllowPolicy::KeepAllowed));
        assert_eq!(publish.roots, Some(vec!["content/".to_string()]));
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<FileConfig, _> = toml::from_str("[publish]\nbranch = \"main\"");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_bind() {
        let config = FileConfig {
            server: Some(ServerSection {
                bind: Some("localhost".to_string()),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn root_without_trailing_slash() {
        let config = publish(PublishSection {
            roots: Some(vec!["public".to_string()]),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_roots() {
        let config = publish(PublishSection {
            roots: Some(vec![]),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn extension_without_dot() {
        let config = publish(PublishSection {
            extensions: Some(vec!["json".to_string()]),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn credential_key_must_be_env_name() {
        let config = FileConfig {
            credentials: Some(CredentialsSection {
                key: Some("CMS TOKEN=".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
