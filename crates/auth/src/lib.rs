//! Session credential handling for SerialAgent clients.
//!
//! Provides the [`SessionStore`] that owns the active bearer credential,
//! the [`AuthApi`] trait over the backend `/auth/*` endpoints with its
//! production REST implementation ([`RestAuthClient`]), and the
//! [`TokenStorage`] backends the credential is persisted to.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sa_domain::config::Config;
//! use sa_auth::{create_storage, RestAuthClient, SessionStore};
//!
//! # async fn example() -> sa_domain::error::Result<()> {
//! let cfg = Config::default();
//! let api = Arc::new(RestAuthClient::new(&cfg.api)?);
//! let session = SessionStore::new(api, create_storage(&cfg.storage)?);
//!
//! session.initialize().await;
//! if !session.is_authenticated() {
//!     session.login("github", None).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod rest;
pub mod session;
pub mod storage;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use api::AuthApi;
pub use rest::{from_reqwest, RestAuthClient};
pub use session::SessionStore;
pub use storage::{FileTokenStorage, KeyringTokenStorage, MemoryTokenStorage, TokenStorage};
pub use types::{Credential, LoginOutcome, SessionIdentity, TokenResponse, VerifyResponse};

use std::sync::Arc;

use sa_domain::config::{StorageBackend, StorageConfig};
use sa_domain::error::{Error, Result};

/// Create the [`TokenStorage`] selected by `storage.backend`.
///
/// | `backend` | Result                                              |
/// |-----------|-----------------------------------------------------|
/// | `file`    | [`FileTokenStorage`] at `storage.path` or the default |
/// | `keyring` | [`KeyringTokenStorage`] (`keyring_service` / `key`)  |
/// | `memory`  | [`MemoryTokenStorage`]                              |
pub fn create_storage(cfg: &StorageConfig) -> Result<Arc<dyn TokenStorage>> {
    match cfg.backend {
        StorageBackend::File => {
            let path = cfg.resolved_path().ok_or_else(|| {
                Error::Config(
                    "unable to determine home directory for credential storage; set storage.path"
                        .into(),
                )
            })?;
            tracing::debug!(path = %path.display(), key = %cfg.key, "using file credential storage");
            Ok(Arc::new(FileTokenStorage::new(path, cfg.key.clone())))
        }
        StorageBackend::Keyring => {
            tracing::debug!(service = %cfg.keyring_service, "using keychain credential storage");
            Ok(Arc::new(KeyringTokenStorage::new(
                cfg.keyring_service.clone(),
                cfg.key.clone(),
            )))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryTokenStorage::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_honours_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = StorageConfig {
            path: Some(tmp.path().join("creds.json")),
            ..Default::default()
        };
        let storage = create_storage(&cfg).unwrap();
        storage.save(&Credential::new("abc")).unwrap();
        assert!(tmp.path().join("creds.json").exists());
    }

    #[test]
    fn memory_backend_starts_empty() {
        let cfg = StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        };
        assert!(create_storage(&cfg).unwrap().load().unwrap().is_none());
    }
}
