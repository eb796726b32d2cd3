//! secrets::credential
//!
//! The single bearer credential used to talk to the source-control host.
//!
//! `CredentialStore` wraps a [`SecretStore`] under one fixed key and keeps an
//! in-process mirror of the last known value. It is passed around explicitly
//! (inside the server state or the CLI context) rather than living in
//! process-global state.
//!
//! # Mirror semantics
//!
//! - The first `read` loads from the backing store and fills the mirror.
//! - `save` writes through and updates the mirror.
//! - `clear` deletes from the backing store and records "no credential".
//! - `set_session` updates only the mirror; the value is gone once the
//!   process exits.

use std::sync::RwLock;

use super::traits::{SecretError, SecretStore};

#[derive(Debug, Clone)]
enum Mirror {
    /// Backing store not consulted yet.
    Unloaded,
    /// Last known value.
    Loaded(Option<String>),
}

/// Credential store with an in-process mirror.
pub struct CredentialStore {
    store: Box<dyn SecretStore>,
    key: String,
    mirror: RwLock<Mirror>,
}

// Custom Debug to avoid exposing the credential
impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded = matches!(
            self.mirror.read().map(|m| m.clone()),
            Ok(Mirror::Loaded(Some(_)))
        );
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .field("has_credential", &loaded)
            .finish()
    }
}

impl CredentialStore {
    /// Create a credential store for `key` on top of `store`.
    pub fn new(store: Box<dyn SecretStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            mirror: RwLock::new(Mirror::Unloaded),
        }
    }

    /// The key the credential is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current credential, if any.
    pub fn read(&self) -> Result<Option<String>, SecretError> {
        if let Mirror::Loaded(value) = self.mirror_snapshot() {
            return Ok(value);
        }

        let value = self.store.get(&self.key)?;
        self.set_mirror(Mirror::Loaded(value.clone()));
        Ok(value)
    }

    /// Persist a credential, replacing any previous one.
    pub fn save(&self, credential: &str) -> Result<(), SecretError> {
        self.store.set(&self.key, credential)?;
        self.set_mirror(Mirror::Loaded(Some(credential.to_string())));
        Ok(())
    }

    /// Remove the stored credential. Clearing an absent credential succeeds.
    pub fn clear(&self) -> Result<(), SecretError> {
        self.store.delete(&self.key)?;
        self.set_mirror(Mirror::Loaded(None));
        Ok(())
    }

    /// Use `credential` for the rest of this process without persisting it.
    pub fn set_session(&self, credential: &str) {
        self.set_mirror(Mirror::Loaded(Some(credential.to_string())));
    }

    fn mirror_snapshot(&self) -> Mirror {
        match self.mirror.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_mirror(&self, value: Mirror) {
        match self.mirror.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::EnvFileStore;
    use std::fs;
    use tempfile::TempDir;

    const KEY: &str = "CMS_GITHUB_TOKEN";

    fn store_at(temp: &TempDir) -> CredentialStore {
        CredentialStore::new(
            Box::new(EnvFileStore::new(temp.path().join(".env.local"))),
            KEY,
        )
    }

    #[test]
    fn read_without_file_is_empty() {
        let temp = TempDir::new().expect("temp");
        let creds = store_at(&temp);

        assert!(creds.read().expect("read").is_none());
    }

    #[test]
    fn save_is_visible_without_file_round_trip() {
        let temp = TempDir::new().expect("temp");
        let creds = store_at(&temp);

        creds.save("ghp_one").expect("save");
        // Tamper with the file: the mirror must win within this process.
        fs::write(temp.path().join(".env.local"), "CMS_GITHUB_TOKEN=other\n").expect("write");

        assert_eq!(creds.read().expect("read"), Some("ghp_one".to_string()));
    }

    #[test]
    fn stored_credential_survives_restart() {
        let temp = TempDir::new().expect("temp");
        store_at(&temp).save("ghp_persisted").expect("save");

        let restarted = store_at(&temp);
        assert_eq!(
            restarted.read().expect("read"),
            Some("ghp_persisted".to_string())
        );
    }

    #[test]
    fn session_credential_does_not_survive_restart() {
        let temp = TempDir::new().expect("temp");
        let creds = store_at(&temp);
        creds.set_session("ghp_ephemeral");
        assert_eq!(
            creds.read().expect("read"),
            Some("ghp_ephemeral".to_string())
        );

        let restarted = store_at(&temp);
        assert!(restarted.read().expect("read").is_none());
    }

    #[test]
    fn clear_without_credential_is_noop_success() {
        let temp = TempDir::new().expect("temp");
        let creds = store_at(&temp);

        creds.clear().expect("clear");

        assert!(creds.read().expect("read").is_none());
    }

    #[test]
    fn clear_invalidates_mirror() {
        let temp = TempDir::new().expect("temp");
        let creds = store_at(&temp);
        creds.save("ghp_x").expect("save");

        creds.clear().expect("clear");

        assert!(creds.read().expect("read").is_none());
        assert!(store_at(&temp).read().expect("read").is_none());
    }

    #[test]
    fn debug_does_not_expose_credential() {
        let temp = TempDir::new().expect("temp");
        let creds = store_at(&temp);
        creds.save("ghp_secret_value").expect("save");

        let debug = format!("{:?}", creds);
        assert!(!debug.contains("ghp_secret_value"));
        assert!(debug.contains("has_credential: true"));
    }
}
