//! content::projects
//!
//! Project listing writer and slug renamer.
//!
//! A project document lives at `pages/project/<slug>.json` and carries its
//! own slug in the `id` field. Renaming moves the file and rewrites `id`.
//! Every destination is checked before the first file is touched, so a
//! conflicting batch changes nothing.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{write_json, ContentError};
use crate::core::paths::SitePaths;

/// Identifier field inside a project document.
const ID_FIELD: &str = "id";

/// A requested rename. Missing or non-string sides read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlugRename {
    #[serde(default, deserialize_with = "lenient_slug")]
    pub from: String,
    #[serde(default, deserialize_with = "lenient_slug")]
    pub to: String,
}

impl SlugRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    fn label(&self) -> String {
        let side = |s: &str| {
            if s.is_empty() {
                "(empty)".to_string()
            } else {
                s.to_string()
            }
        };
        format!("{}=>{}", side(&self.from), side(&self.to))
    }
}

fn lenient_slug<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::trim).unwrap_or_default().to_string())
}

fn is_invalid_slug(slug: &str) -> bool {
    slug.is_empty() || slug.contains('/') || slug.contains('\\')
}

/// Outcome of a rename batch, as `from=>to` labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub renamed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Result of a project registry update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectUpdateOutcome {
    pub path: String,
    pub renames: RenameReport,
}

struct RenameTask {
    rename: SlugRename,
    from_path: PathBuf,
    to_path: PathBuf,
}

/// Project listing and per-project documents.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    listing_path: PathBuf,
    project_dir: PathBuf,
}

impl ProjectRegistry {
    pub fn new(paths: &SitePaths) -> Self {
        Self {
            listing_path: paths.projects_path(),
            project_dir: paths.project_dir(),
        }
    }

    fn document_path(&self, slug: &str) -> PathBuf {
        self.project_dir.join(format!("{}.json", slug))
    }

    /// Rename project documents.
    ///
    /// Pairs with an empty, equal or path-like slug, or with no source
    /// document, are skipped. If any destination already exists (or two
    /// pairs share one) the whole batch fails with
    /// [`ContentError::Conflict`] before anything is moved.
    pub fn rename_projects(&self, renames: &[SlugRename]) -> Result<RenameReport, ContentError> {
        let mut report = RenameReport::default();
        let mut tasks = Vec::new();

        for rename in renames {
            if rename.from.is_empty() || rename.to.is_empty() || rename.from == rename.to {
                report.skipped.push(rename.label());
                continue;
            }
            if is_invalid_slug(&rename.from) || is_invalid_slug(&rename.to) {
                report.skipped.push(rename.label());
                continue;
            }

            let from_path = self.document_path(&rename.from);
            if !from_path.exists() {
                report.skipped.push(rename.label());
                continue;
            }

            tasks.push(RenameTask {
                to_path: self.document_path(&rename.to),
                rename: rename.clone(),
                from_path,
            });
        }

        let mut destinations = HashSet::new();
        for task in &tasks {
            if task.to_path.exists() || !destinations.insert(task.rename.to.as_str()) {
                return Err(ContentError::Conflict(format!(
                    "{}.json already exists",
                    task.rename.to
                )));
            }
        }

        for task in &tasks {
            self.move_document(task)?;
            debug!(rename = %task.rename.label(), "project renamed");
            report.renamed.push(task.rename.label());
        }

        Ok(report)
    }

    /// Move one document, rewriting its identifier when it is a JSON object.
    fn move_document(&self, task: &RenameTask) -> Result<(), ContentError> {
        let io = |path: &PathBuf, source: std::io::Error| ContentError::Io {
            path: path.clone(),
            source,
        };

        let parsed = fs::read_to_string(&task.from_path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok());

        match parsed {
            Some(Value::Object(mut doc)) => {
                doc.insert(ID_FIELD.to_string(), Value::String(task.rename.to.clone()));
                write_json(&task.to_path, &doc)?;
                fs::remove_file(&task.from_path).map_err(|e| io(&task.from_path, e))
            }
            _ => fs::rename(&task.from_path, &task.to_path).map_err(|e| io(&task.from_path, e)),
        }
    }

    /// Overwrite the project listing.
    pub fn write_listing(&self, listing: &Map<String, Value>) -> Result<(), ContentError> {
        write_json(&self.listing_path, listing)
    }

    /// Apply an update body: `{payload, renames?}` or a bare listing object.
    ///
    /// Renames run first; the listing (minus any `renames` key) is written
    /// only if they succeed.
    pub fn apply(&self, body: &Value) -> Result<ProjectUpdateOutcome, ContentError> {
        let object = body
            .as_object()
            .ok_or_else(|| ContentError::InvalidPayload("Invalid payload".to_string()))?;

        let renames: Vec<SlugRename> = object
            .get("renames")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| serde_json::from_value(e.clone()).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        let mut listing = match object.get("payload") {
            Some(Value::Object(payload)) => payload.clone(),
            _ => object.clone(),
        };
        listing.shift_remove("renames");

        let report = self.rename_projects(&renames)?;
        self.write_listing(&listing)?;
        info!(
            renamed = report.renamed.len(),
            skipped = report.skipped.len(),
            "project listing written"
        );

        Ok(ProjectUpdateOutcome {
            path: self.listing_path.display().to_string(),
            renames: report,
        })
    }
}
