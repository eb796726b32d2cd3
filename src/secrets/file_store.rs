//! secrets::file_store
//!
//! Key-file secret storage (`KEY=value` lines, dotenv style).
//!
//! # Format
//!
//! One entry per line. Unrelated lines are preserved on every write, blank
//! lines are dropped, and the file always ends with a newline unless it is
//! empty. Clearing the last entry truncates the file instead of deleting it.
//!
//! # Security
//!
//! - File permissions are set to 0600 on Unix (owner read/write only)
//! - All writes are atomic (write to temp file, then rename)
//! - Secrets are NEVER logged, printed, or included in error messages

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::traits::{SecretError, SecretStore};

/// Key-file secret storage.
///
/// Typically points at the site's `.env.local`.
#[derive(Debug)]
pub struct EnvFileStore {
    /// Path to the key file
    path: PathBuf,
}

impl EnvFileStore {
    /// Create a store backed by the key file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw file. A missing file reads as empty.
    fn read_content(&self) -> Result<String, SecretError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(SecretError::ReadError(format!(
                "cannot read key file: {}",
                e
            ))),
        }
    }

    /// Write the file atomically with restrictive permissions.
    ///
    /// Each write stages into its own temp file beside the target, so
    /// concurrent writers never share a staging path.
    fn write_content(&self, content: &str) -> Result<(), SecretError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;

        let mut file = NamedTempFile::new_in(parent)
            .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

        // Restrict permissions before any content lands on disk
        #[cfg(unix)]
        {
            let permissions = fs::Permissions::from_mode(0o600);
            file.as_file().set_permissions(permissions).map_err(|e| {
                SecretError::WriteError(format!("cannot set permissions: {}", e))
            })?;
        }

        file.write_all(content.as_bytes())
            .map_err(|e| SecretError::WriteError(format!("cannot write key file: {}", e)))?;

        file.as_file()
            .sync_all()
            .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;

        file.persist(&self.path).map_err(|e| {
            SecretError::WriteError(format!("cannot rename temp file: {}", e.error))
        })?;

        Ok(())
    }
}

/// Lines of `content` that do not assign `key`, with blank lines removed.
fn other_lines<'a>(content: &'a str, key: &str) -> Vec<&'a str> {
    let prefix = format!("{}=", key);
    content
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.starts_with(&prefix) && !line.trim().is_empty())
        .collect()
}

fn render_lines(lines: &[&str]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

fn check_entry(key: &str, value: &str) -> Result<(), SecretError> {
    if key.is_empty() || key.contains('=') || key.contains(['\n', '\r']) {
        return Err(SecretError::InvalidEntry("malformed key".into()));
    }
    if value.contains(['\n', '\r']) {
        return Err(SecretError::InvalidEntry(
            "value must fit on a single line".into(),
        ));
    }
    Ok(())
}

impl SecretStore for EnvFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let content = self.read_content()?;
        let prefix = format!("{}=", key);

        let value = content
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .find_map(|line| line.strip_prefix(prefix.as_str()))
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        check_entry(key, value)?;

        let content = self.read_content()?;
        let entry = format!("{}={}", key, value);
        let mut lines = other_lines(&content, key);
        lines.push(&entry);

        self.write_content(&render_lines(&lines))
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let content = self.read_content()?;
        if content.is_empty() {
            return Ok(());
        }

        let lines = other_lines(&content, key);
        self.write_content(&render_lines(&lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "CMS_GITHUB_TOKEN";

    fn create_test_store() -> (TempDir, EnvFileStore) {
        let temp = TempDir::new().expect("create temp dir");
        let store = EnvFileStore::new(temp.path().join(".env.local"));
        (temp, store)
    }

    #[test]
    fn get_without_file_returns_none() {
        let (_temp, store) = create_test_store();

        assert!(store.get(KEY).expect("get").is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn set_and_get() {
        let (_temp, store) = create_test_store();

        store.set(KEY, "ghp_test").expect("set");

        assert_eq!(store.get(KEY).expect("get"), Some("ghp_test".to_string()));
        let raw = fs::read_to_string(store.path()).expect("read");
        assert_eq!(raw, "CMS_GITHUB_TOKEN=ghp_test\n");
    }

    #[test]
    fn set_overwrites_and_preserves_other_lines() {
        let (_temp, store) = create_test_store();
        fs::write(
            store.path(),
            "NUXT_PUBLIC_SITE=https://example.com\nCMS_GITHUB_TOKEN=old\n\nOTHER=1\n",
        )
        .expect("seed");

        store.set(KEY, "new").expect("set");

        let raw = fs::read_to_string(store.path()).expect("read");
        assert_eq!(
            raw,
            "NUXT_PUBLIC_SITE=https://example.com\nOTHER=1\nCMS_GITHUB_TOKEN=new\n"
        );
        assert_eq!(store.get(KEY).expect("get"), Some("new".to_string()));
    }

    #[test]
    fn crlf_lines_are_understood() {
        let (_temp, store) = create_test_store();
        fs::write(store.path(), "A=1\r\nCMS_GITHUB_TOKEN=abc\r\n").expect("seed");

        assert_eq!(store.get(KEY).expect("get"), Some("abc".to_string()));
    }

    #[test]
    fn empty_value_reads_as_none() {
        let (_temp, store) = create_test_store();
        fs::write(store.path(), "CMS_GITHUB_TOKEN=\n").expect("seed");

        assert!(store.get(KEY).expect("get").is_none());
    }

    #[test]
    fn delete_keeps_unrelated_lines() {
        let (_temp, store) = create_test_store();
        fs::write(store.path(), "A=1\nCMS_GITHUB_TOKEN=abc\n").expect("seed");

        store.delete(KEY).expect("delete");

        assert_eq!(fs::read_to_string(store.path()).expect("read"), "A=1\n");
        assert!(store.get(KEY).expect("get").is_none());
    }

    #[test]
    fn delete_last_entry_truncates_file() {
        let (_temp, store) = create_test_store();
        store.set(KEY, "abc").expect("set");

        store.delete(KEY).expect("delete");

        assert!(store.path().exists(), "file must be truncated, not removed");
        assert_eq!(fs::read_to_string(store.path()).expect("read"), "");
    }

    #[test]
    fn delete_without_file_is_noop() {
        let (_temp, store) = create_test_store();

        store.delete(KEY).expect("delete");

        assert!(!store.path().exists());
    }

    #[test]
    fn multiline_value_rejected() {
        let (_temp, store) = create_test_store();

        let err = store.set(KEY, "abc\nEVIL=1").unwrap_err();

        assert!(matches!(err, SecretError::InvalidEntry(_)));
        assert!(!err.to_string().contains("abc"));
    }

    #[cfg(unix)]
    #[test]
    fn permissions_0600_on_unix() {
        let (_temp, store) = create_test_store();

        store.set(KEY, "value").expect("set");

        let metadata = fs::metadata(store.path()).expect("metadata");
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "permissions should be 0600");
    }

    #[test]
    fn concurrent_saves_do_not_collide() {
        let (temp, store) = create_test_store();
        let path = store.path().to_path_buf();

        let writers: Vec<_> = (0..8)
            .map(|n| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store = EnvFileStore::new(path);
                    for round in 0..25 {
                        store.set(KEY, &format!("ghp_{}_{}", n, round))?;
                    }
                    Ok::<(), SecretError>(())
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread").expect("set");
        }

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.starts_with("CMS_GITHUB_TOKEN=ghp_"), "{:?}", raw);
        assert_eq!(raw.lines().count(), 1);

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("list")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from(".env.local")]);
    }

    #[test]
    fn persistence_across_instances() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join(".env.local");

        EnvFileStore::new(path.clone())
            .set(KEY, "value")
            .expect("set");

        let result = EnvFileStore::new(path).get(KEY).expect("get");
        assert_eq!(result, Some("value".to_string()));
    }
}
