//! publish::url
//!
//! Credential embedding and redaction for remote URLs.
//!
//! The credential goes into the URL *username*, never a query parameter.
//! Anything returned to a caller or written to a log goes through
//! [`redact_url`] or [`scrub`] first.

use reqwest::Url;

/// Rewrite an scp-style SSH remote (`git@host:owner/name`) to HTTPS.
///
/// URL-style remotes are returned unchanged.
pub fn to_https_remote(remote: &str) -> String {
    let remote = remote.trim();
    if remote.contains("://") {
        return remote.to_string();
    }

    match remote.split_once(':') {
        Some((user_host, path)) if !user_host.contains('/') => {
            let host = user_host.rsplit('@').next().unwrap_or(user_host);
            format!("https://{}/{}", host, path.trim_start_matches('/'))
        }
        _ => remote.to_string(),
    }
}

/// Build a push URL carrying `credential` as the URL username.
///
/// # Example
///
/// ```
/// use sitecms::publish::url::attach_credential;
///
/// assert_eq!(
///     attach_credential("git@github.com:acme/site.git", "ghp_x"),
///     "https://ghp_x@github.com/acme/site.git"
/// );
/// ```
pub fn attach_credential(remote: &str, credential: &str) -> String {
    let https = to_https_remote(remote);

    if let Ok(mut url) = Url::parse(&https) {
        if url.set_username(credential).is_ok() && url.set_password(None).is_ok() {
            return url.to_string();
        }
    }

    format!("https://{}@{}", credential, strip_scheme(&https))
}

/// Remove any username/password from a URL.
pub fn redact_url(url: &str) -> String {
    if let Ok(mut parsed) = Url::parse(url) {
        if parsed.set_username("").is_ok() && parsed.set_password(None).is_ok() {
            return parsed.to_string();
        }
    }

    // Unparsable: drop everything between the scheme and the first '@'.
    match url.find("://") {
        Some(idx) => {
            let rest = &url[idx + 3..];
            let authority_end = rest.find('/').unwrap_or(rest.len());
            match rest[..authority_end].rfind('@') {
                Some(at) => format!("https://{}", &rest[at + 1..]),
                None => url.to_string(),
            }
        }
        None => url.to_string(),
    }
}

/// Replace every occurrence of `secret` in `text` with `***`.
///
/// The percent-encoded form that [`attach_credential`] puts into a URL is
/// masked too, since git echoes the URL as it was given.
pub fn scrub(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }

    let mut scrubbed = text.replace(secret, "***");
    if let Some(encoded) = encoded_userinfo(secret) {
        if encoded != secret {
            scrubbed = scrubbed.replace(&encoded, "***");
        }
    }
    scrubbed
}

/// `secret` as it appears in the username of a URL.
fn encoded_userinfo(secret: &str) -> Option<String> {
    let mut url = Url::parse("https://host.invalid/").ok()?;
    url.set_username(secret).ok()?;
    Some(url.username().to_string())
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}
