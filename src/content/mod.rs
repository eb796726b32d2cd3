//! content
//!
//! Multi-document content edits that must keep the site consistent.
//!
//! - [`LocaleRegistryWriter`]: rewrites the locale registry and seeds a
//!   translation block for every new locale in the content index
//! - [`ProjectRegistry`]: renames project documents by slug and rewrites
//!   the project listing
//!
//! # Atomicity
//!
//! Each individual file is written atomically (temp file + rename). Edits
//! spanning two files are not: the locale writer restores the first file
//! with a compensating write when the second step fails, and a crash in
//! between leaves the first file updated.

mod locales;
mod projects;

pub use locales::{
    sanitize_locales, LocaleRecord, LocaleRegistry, LocaleRegistryWriter, LocaleUpdateOutcome,
    LEGACY_TEMPLATE_KEY, REQUIRED_LOCALES, TEMPLATE_KEY,
};
pub use projects::{ProjectRegistry, ProjectUpdateOutcome, RenameReport, SlugRename};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

/// Errors from content edits.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The request body failed validation. Nothing was written.
    #[error("{0}")]
    InvalidPayload(String),

    /// A destination already exists. Nothing was written.
    #[error("{0}")]
    Conflict(String),

    /// A file could not be read or written.
    #[error("cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A document is not valid JSON.
    #[error("invalid JSON in '{path}': {message}")]
    Json { path: PathBuf, message: String },

    /// The content index has no `translations` object.
    #[error("content index has no translations")]
    MissingTranslations,

    /// The content index has no translation template.
    #[error("content index has no translation template")]
    MissingTemplate,
}

impl ContentError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ContentError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Render `value` as JSON indented with four spaces.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(out)
}

/// Serialize `value` and write it atomically to `path`.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ContentError> {
    let bytes = to_pretty_json(value).map_err(|e| ContentError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    write_atomic(path, &bytes)
}

/// Write `bytes` to `path` through a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ContentError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ContentError::io(parent, e))?;
        }
    }

    let temp_path = path.with_extension("json.sitecms-tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| ContentError::io(&temp_path, e))?;
        file.write_all(bytes)
            .map_err(|e| ContentError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| ContentError::io(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| ContentError::io(path, e))
}

/// Read and parse a JSON document.
pub(crate) fn read_json(path: &Path) -> Result<serde_json::Value, ContentError> {
    let raw = fs::read_to_string(path).map_err(|e| ContentError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| ContentError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_json_uses_four_spaces_and_keeps_order() {
        let value = json!({"zeta": 1, "alpha": {"nested": true}});
        let text = String::from_utf8(to_pretty_json(&value).unwrap()).unwrap();

        assert_eq!(
            text,
            "{\n    \"zeta\": 1,\n    \"alpha\": {\n        \"nested\": true\n    }\n}"
        );
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pages/project/alpha.json");

        write_json(&path, &json!({"id": "alpha"})).unwrap();

        assert!(path.exists());
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains("sitecms-tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn read_json_reports_path_on_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let err = read_json(&path).unwrap_err();
        assert!(matches!(err, ContentError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
