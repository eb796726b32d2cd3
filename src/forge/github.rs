//! forge::github
//!
//! GitHub host implementation using the REST API.
//!
//! # Endpoints
//!
//! - `GET /user`: identity behind the bearer credential
//! - `GET /repos/{owner}/{repo}/collaborators/{login}`: 204 when the login
//!   is a collaborator
//!
//! The API base is configurable for GitHub Enterprise and for tests.
//!
//! # Example
//!
//! ```ignore
//! use sitecms::forge::{GitHubHost, Host};
//!
//! let host = GitHubHost::new();
//! let identity = host.fetch_identity(&token).await?;
//! println!("signed in as {}", identity.login);
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::traits::{Host, HostError, Identity, RepoSlug};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default User-Agent header value for API requests.
pub const DEFAULT_USER_AGENT: &str = "sitecms";

/// GitHub host implementation.
#[derive(Debug, Clone)]
pub struct GitHubHost {
    /// HTTP client for making requests
    client: Client,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// User-Agent header value
    user_agent: String,
}

impl Default for GitHubHost {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubHost {
    /// Create a host talking to `api.github.com`.
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    /// Create a host with a custom API base URL.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Override the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// API base URL in use.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self, credential: &str) -> Result<HeaderMap, HostError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", credential))
            .map_err(|_| HostError::MalformedCredential)?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let agent = HeaderValue::from_str(&self.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(USER_AGENT, agent);
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    async fn get(&self, url: &str, credential: &str) -> Result<Response, HostError> {
        self.client
            .get(url)
            .headers(self.headers(credential)?)
            .send()
            .await
            .map_err(|e| HostError::Unreachable(e.without_url().to_string()))
    }

    /// Turn a non-success response into [`HostError::Status`].
    async fn status_error(response: Response) -> HostError {
        let status = response.status().as_u16();
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };
        HostError::Status { status, message }
    }
}

#[async_trait]
impl Host for GitHubHost {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_identity(&self, credential: &str) -> Result<Identity, HostError> {
        let url = format!("{}/user", self.api_base);
        let response = self.get(&url, credential).await?;
        let status = response.status();
        debug!(status = status.as_u16(), "fetched current user");

        if !status.is_success() {
            return Err(Self::status_error(response).await);
        }

        let user: GitHubUser = response
            .json()
            .await
            .map_err(|e| HostError::InvalidResponse(format!("cannot parse user: {}", e)))?;

        Ok(user.into())
    }

    async fn check_collaborator(
        &self,
        credential: &str,
        slug: &RepoSlug,
        login: &str,
    ) -> Result<(), HostError> {
        let url = format!(
            "{}/repos/{}/{}/collaborators/{}",
            self.api_base, slug.owner, slug.name, login
        );
        let response = self.get(&url, credential).await?;
        let status = response.status();
        debug!(status = status.as_u16(), %slug, "checked collaborator access");

        if status == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }
}

// =============================================================================
// GitHub API types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GitHubUser {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl From<GitHubUser> for Identity {
    fn from(user: GitHubUser) -> Self {
        let login = user.login.unwrap_or_default();
        let name = user
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| login.clone());
        Identity {
            login,
            name,
            avatar_url: user.avatar_url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Parse `owner/name` from a git remote URL.
///
/// Accepts scp-style SSH remotes (`git@host:owner/name.git`) and URL-style
/// remotes (`https://host/owner/name`, `ssh://git@host/owner/name.git`),
/// with or without embedded credentials or a `.git` suffix.
///
/// # Example
///
/// ```
/// use sitecms::forge::parse_remote_slug;
///
/// let slug = parse_remote_slug("git@github.com:octocat/hello-world.git").unwrap();
/// assert_eq!(slug.to_string(), "octocat/hello-world");
/// ```
pub fn parse_remote_slug(remote: &str) -> Option<RepoSlug> {
    let remote = remote.trim();
    if remote.is_empty() {
        return None;
    }

    let path = if remote.contains("://") {
        let url = Url::parse(remote).ok()?;
        url.host_str()?;
        url.path().to_string()
    } else {
        // scp-like: [user@]host:path
        let (host, path) = remote.split_once(':')?;
        if host.is_empty() || host.contains('/') {
            return None;
        }
        path.to_string()
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Some(RepoSlug {
                owner: owner.to_string(),
                name: name.to_string(),
            })
        }
        _ => None,
    }
}
