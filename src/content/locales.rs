//! content::locales
//!
//! Locale registry writer.
//!
//! # Update sequence
//!
//! 1. Sanitize and validate the incoming list (fails before any write)
//! 2. Remember the current registry bytes (an unreadable registry fails
//!    here, before any write)
//! 3. Write the new registry
//! 4. Copy the translation template into the content index for every new
//!    locale
//! 5. If step 4 fails, restore the registry from step 2 and return the
//!    step 4 error
//!
//! The restore in step 5 is best effort; its own failure is logged, not
//! returned. When no registry existed before, the new file is removed.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{read_json, write_atomic, write_json, ContentError};
use crate::core::paths::SitePaths;

/// Locale codes every registry must contain.
pub const REQUIRED_LOCALES: &[&str] = &["ru", "en"];

/// Translation template key.
pub const TEMPLATE_KEY: &str = "example";

/// Misspelled template key found in older content indexes. Takes
/// precedence over [`TEMPLATE_KEY`] when present.
pub const LEGACY_TEMPLATE_KEY: &str = "expamle";

/// One locale entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleRecord {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub iso: String,
}

/// The registry document (`locales.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleRegistry {
    pub default: String,
    pub locales: Vec<LocaleRecord>,
}

impl LocaleRegistry {
    /// Locale codes in registry order.
    pub fn codes(&self) -> Vec<&str> {
        self.locales.iter().map(|l| l.code.as_str()).collect()
    }
}

/// Result of a successful registry update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleUpdateOutcome {
    pub count: usize,
    pub path: String,
    pub added_translations: Vec<String>,
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Validate an update body `{locales: [...], default?}` into a registry.
///
/// Codes are trimmed, entries without a code dropped, names default to the
/// code, and duplicates keep their first occurrence. The registry must
/// contain [`REQUIRED_LOCALES`] and the chosen default (the first code when
/// none is given).
pub fn sanitize_locales(body: &Value) -> Result<LocaleRegistry, ContentError> {
    let body = body
        .as_object()
        .ok_or_else(|| ContentError::InvalidPayload("Invalid payload".to_string()))?;

    let raw = body
        .get("locales")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut locales = Vec::new();
    for entry in raw {
        let code = text_of(entry.get("code"));
        if code.is_empty() || !seen.insert(code.clone()) {
            continue;
        }
        let name = Some(text_of(entry.get("name")))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| code.clone());
        let iso = entry
            .get("iso")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        locales.push(LocaleRecord { code, name, iso });
    }

    if locales.is_empty() {
        return Err(ContentError::InvalidPayload(
            "No locales provided".to_string(),
        ));
    }

    let missing: Vec<&str> = REQUIRED_LOCALES
        .iter()
        .copied()
        .filter(|code| !seen.contains(*code))
        .collect();
    if !missing.is_empty() {
        return Err(ContentError::InvalidPayload(format!(
            "Missing required locales: {}",
            missing.join(", ")
        )));
    }

    let default = body
        .get("default")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| locales[0].code.clone());

    if !seen.contains(&default) {
        return Err(ContentError::InvalidPayload(format!(
            "Default locale '{}' is not in the locale list",
            default
        )));
    }

    Ok(LocaleRegistry { default, locales })
}

/// Writes the locale registry and keeps the content index in step.
#[derive(Debug, Clone)]
pub struct LocaleRegistryWriter {
    registry_path: PathBuf,
    index_path: PathBuf,
}

impl LocaleRegistryWriter {
    pub fn new(paths: &SitePaths) -> Self {
        Self {
            registry_path: paths.locales_path(),
            index_path: paths.index_path(),
        }
    }

    /// The registry document as stored.
    pub fn read_registry(&self) -> Result<Value, ContentError> {
        read_json(&self.registry_path)
    }

    /// Validate `body` and overwrite the registry.
    pub fn update(&self, body: &Value) -> Result<LocaleUpdateOutcome, ContentError> {
        let registry = sanitize_locales(body)?;

        let previous = match fs::read(&self.registry_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ContentError::io(&self.registry_path, e)),
        };
        write_json(&self.registry_path, &registry)?;
        debug!(count = registry.locales.len(), "locale registry written");

        match self.propagate_template(&registry.codes()) {
            Ok(added) => {
                info!(count = registry.locales.len(), added = ?added, "locales updated");
                Ok(LocaleUpdateOutcome {
                    count: registry.locales.len(),
                    path: self.registry_path.display().to_string(),
                    added_translations: added,
                })
            }
            Err(err) => {
                warn!(error = %err, "translation propagation failed, restoring registry");
                self.restore(previous);
                Err(err)
            }
        }
    }

    fn restore(&self, previous: Option<Vec<u8>>) {
        let result = match previous {
            Some(bytes) => write_atomic(&self.registry_path, &bytes),
            None => fs::remove_file(&self.registry_path)
                .map_err(|e| ContentError::Io {
                    path: self.registry_path.clone(),
                    source: e,
                }),
        };
        if let Err(err) = result {
            warn!(error = %err, "registry rollback failed");
        }
    }

    /// Copy the template block to every code missing from the index.
    ///
    /// Returns the codes that were added; the index is only rewritten when
    /// that list is non-empty.
    fn propagate_template(&self, codes: &[&str]) -> Result<Vec<String>, ContentError> {
        let mut index = read_json(&self.index_path)?;

        let translations = index
            .get_mut("translations")
            .and_then(Value::as_object_mut)
            .ok_or(ContentError::MissingTranslations)?;

        let template = [LEGACY_TEMPLATE_KEY, TEMPLATE_KEY]
            .iter()
            .filter_map(|key| translations.get(*key))
            .find(|block| block.is_object())
            .cloned()
            .ok_or(ContentError::MissingTemplate)?;

        let mut added = Vec::new();
        for code in codes {
            if *code == LEGACY_TEMPLATE_KEY || *code == TEMPLATE_KEY {
                continue;
            }
            if translations.contains_key(*code) {
                continue;
            }
            translations.insert(code.to_string(), template.clone());
            added.push(code.to_string());
        }

        if !added.is_empty() {
            write_json(&self.index_path, &index)?;
        }
        Ok(added)
    }
}
