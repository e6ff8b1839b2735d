//! Durable client-side storage for the session credential.
//!
//! A single raw token lives under one key (`sa_token` by default).  The
//! [`TokenStorage`] trait is synchronous: persisting or clearing a token
//! never needs to suspend, and `logout` must stay synchronous.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sa_domain::error::{Error, Result};

use crate::types::Credential;

/// Persistent home of the session credential.
pub trait TokenStorage: Send + Sync {
    /// Read the stored token, if any.
    fn load(&self) -> Result<Option<Credential>>;

    /// Store `credential`, replacing any previous value.
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Remove the stored token.  Clearing an empty store succeeds.
    fn clear(&self) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// File-backed storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// JSON key/value file, e.g. `{"sa_token": "abc"}`.
///
/// Other keys in the file are preserved.  On Unix the file is created with
/// mode `0o600`; `fs2` locks keep concurrent processes from interleaving
/// reads and writes.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
    key: String,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = std::fs::File::open(&self.path)?;
        fs2::FileExt::lock_shared(&file)
            .map_err(|e| Error::Storage(format!("credential file lock failed: {e}")))?;
        let raw = std::io::read_to_string(&file)?;
        fs2::FileExt::unlock(&file)
            .map_err(|e| Error::Storage(format!("credential file unlock failed: {e}")))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| Error::Storage(format!("corrupt credential file: {e}")))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;

        // Truncate only under the lock so readers never see an empty file.
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&self.path)?;
        fs2::FileExt::lock_exclusive(&file)
            .map_err(|e| Error::Storage(format!("credential file lock failed: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.set_len(0)?;
        let mut writer = std::io::BufWriter::new(file);
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        // Lock is released when the file is dropped.
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<Credential>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(&self.key)
            .filter(|t| !t.is_empty())
            .map(|t| Credential::new(t.clone())))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %self.path.display(), "discarding unreadable credential file");
            BTreeMap::new()
        });
        entries.insert(self.key.clone(), credential.expose().to_owned());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            // An unreadable file cannot be trusted to hold anything but
            // the token; start over from an empty map.
            Err(_) => BTreeMap::new(),
        };
        entries.remove(&self.key);
        self.write_entries(&entries)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OS keychain storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Stores the token in the platform keychain (macOS Keychain, Windows
/// Credential Manager, Linux Secret Service) via the `keyring` crate.
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    service: String,
    account: String,
}

impl KeyringTokenStorage {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| Error::Storage(format!("keyring entry creation failed: {e}")))
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn load(&self) -> Result<Option<Credential>> {
        match self.entry()?.get_password() {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(Credential::new(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(format!("keyring get_password failed: {e}"))),
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        self.entry()?
            .set_password(credential.expose())
            .map_err(|e| Error::Storage(format!("keyring set_password failed: {e}")))
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!("keyring delete failed: {e}"))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<Credential>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<Credential>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    /// Current raw value, for inspection.
    pub fn peek(&self) -> Option<Credential> {
        self.token.lock().clone()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.token.lock() = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trips_under_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("credentials.json");
        let storage = FileTokenStorage::new(&path, "sa_token");

        assert!(storage.load().unwrap().is_none());
        storage.save(&Credential::new("abc")).unwrap();
        assert_eq!(storage.load().unwrap(), Some(Credential::new("abc")));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["sa_token"], "abc");
    }

    #[test]
    fn file_storage_clear_keeps_other_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        std::fs::write(&path, r#"{"theme":"dark","sa_token":"abc"}"#).unwrap();
        let storage = FileTokenStorage::new(&path, "sa_token");

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert!(raw.get("sa_token").is_none());
    }

    #[test]
    fn file_storage_clear_without_file_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(tmp.path().join("none.json"), "sa_token");
        storage.clear().unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();
        let storage = FileTokenStorage::new(&path, "sa_token");

        assert!(matches!(storage.load(), Err(Error::Storage(_))));
        // clear still succeeds and leaves a readable file behind
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn empty_token_reads_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        std::fs::write(&path, r#"{"sa_token":""}"#).unwrap();
        let storage = FileTokenStorage::new(&path, "sa_token");
        assert!(storage.load().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        FileTokenStorage::new(&path, "sa_token")
            .save(&Credential::new("abc"))
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn save_tightens_existing_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        FileTokenStorage::new(&path, "sa_token")
            .save(&Credential::new("abc"))
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn shorter_rewrite_leaves_no_stale_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        let storage = FileTokenStorage::new(&path, "sa_token");

        storage.save(&Credential::new("a-very-long-token-value-0123456789")).unwrap();
        storage.save(&Credential::new("t")).unwrap();

        assert_eq!(storage.load().unwrap(), Some(Credential::new("t")));
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"sa_token": "t"}));
    }

    #[test]
    fn memory_storage_behaves() {
        let storage = MemoryTokenStorage::with_token("t1");
        assert_eq!(storage.load().unwrap(), Some(Credential::new("t1")));
        storage.save(&Credential::new("t2")).unwrap();
        assert_eq!(storage.peek(), Some(Credential::new("t2")));
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    #[ignore] // Requires a running keychain daemon (skip in CI)
    fn keyring_storage_integration() {
        let storage = KeyringTokenStorage::new("serialagent-test", "sa_token_it");
        storage.save(&Credential::new("kc-secret")).unwrap();
        assert_eq!(storage.load().unwrap(), Some(Credential::new("kc-secret")));
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }
}
