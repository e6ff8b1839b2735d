use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credential storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "d_backend")]
    pub backend: StorageBackend,
    /// Location of the credentials file for the `file` backend.
    /// Defaults to `~/.serialagent/credentials.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Key the raw token is stored under.
    #[serde(default = "d_key")]
    pub key: String,
    /// Keychain service name for the `keyring` backend.
    #[serde(default = "d_service")]
    pub keyring_service: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Keyring,
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: None,
            key: d_key(),
            keyring_service: d_service(),
        }
    }
}

impl StorageConfig {
    /// Resolve the credentials file path, falling back to the home directory.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.path {
            return Some(p.clone());
        }
        dirs::home_dir().map(|home| home.join(".serialagent").join("credentials.json"))
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_backend() -> StorageBackend {
    StorageBackend::File
}
fn d_key() -> String {
    "sa_token".into()
}
fn d_service() -> String {
    "serialagent".into()
}
