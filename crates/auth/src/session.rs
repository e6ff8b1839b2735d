//! The session store: owner of the single active credential.
//!
//! Consumers never mutate the credential directly.  They read it through
//! [`SessionStore::token`] or follow changes through
//! [`SessionStore::subscribe`], which only notifies when the credential
//! actually changes identity.

use std::sync::Arc;

use parking_lot::Mutex;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;
use tokio::sync::watch;

use crate::api::AuthApi;
use crate::storage::TokenStorage;
use crate::types::{Credential, LoginOutcome, SessionIdentity};

/// Holds the current credential, restores it at startup and persists it
/// across logins.
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn TokenStorage>,
    credential: watch::Sender<Option<Credential>>,
    loading: watch::Sender<bool>,
    identity: Mutex<Option<SessionIdentity>>,
}

impl SessionStore {
    /// Create a store in the loading state with no credential.
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn TokenStorage>) -> Self {
        let (credential, _) = watch::channel(None);
        let (loading, _) = watch::channel(true);
        Self {
            api,
            storage,
            credential,
            loading,
            identity: Mutex::new(None),
        }
    }

    // ── state ────────────────────────────────────────────────────────

    pub fn token(&self) -> Option<Credential> {
        self.credential.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.borrow().is_some()
    }

    /// `true` until [`initialize`](Self::initialize) has finished.
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Identity reported by the last successful verification, if any.
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.identity.lock().clone()
    }

    /// Follow credential changes.  The receiver is notified only when the
    /// credential changes identity (absent ↔ present, or a new value).
    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.credential.subscribe()
    }

    /// Follow the loading flag.
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    // ── operations ───────────────────────────────────────────────────

    /// Restore the persisted credential and verify it with the backend.
    ///
    /// A credential that fails verification (rejected, network error, ...)
    /// is dropped and removed from storage.  Never fails; always ends with
    /// the loading flag cleared.
    pub async fn initialize(&self) {
        self.loading.send_replace(true);

        let stored = match self.storage.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored credential, starting signed out");
                None
            }
        };

        if let Some(token) = stored {
            match self.api.verify_token(&token).await {
                Ok(resp) if resp.authenticated != Some(false) => {
                    *self.identity.lock() = Some(resp.identity());
                    self.set_credential(Some(token));
                    tracing::info!("stored credential verified");
                    TraceEvent::CredentialRestored { verified: true }.emit();
                }
                Ok(_) => {
                    self.discard_rejected(&token, "backend reported authenticated=false");
                }
                Err(e) => {
                    self.discard_rejected(&token, &e.to_string());
                }
            }
        }

        self.loading.send_replace(false);
    }

    /// Sign in, either with an API key or by requesting a token for
    /// `service`.
    ///
    /// With a non-empty `api_key` the key is verified and becomes the
    /// credential, unless the backend hands back a replacement `token`.
    /// On failure nothing changes and the error is returned.
    pub async fn login(&self, service: &str, api_key: Option<&str>) -> Result<LoginOutcome> {
        let result = self.login_inner(service, api_key).await;
        if let Err(ref e) = result {
            tracing::warn!(service = %service, error = %e, "login failed");
        }
        result
    }

    async fn login_inner(&self, service: &str, api_key: Option<&str>) -> Result<LoginOutcome> {
        let api_key = api_key.filter(|k| !k.is_empty());

        let outcome = match api_key {
            Some(key) => {
                let resp = self.api.verify_api_key(key).await?;
                if resp.authenticated == Some(false) {
                    return Err(Error::Auth("api key rejected".into()));
                }
                let credential = resp
                    .token
                    .clone()
                    .filter(|t| !t.is_empty())
                    .map(Credential::new)
                    .unwrap_or_else(|| Credential::new(key));
                LoginOutcome {
                    credential,
                    expires_in: None,
                    identity: Some(resp.identity()),
                }
            }
            None => {
                let resp = self.api.issue_token(service).await?;
                let token = resp.token.filter(|t| !t.is_empty()).ok_or_else(|| {
                    Error::Auth(format!("token response for service '{service}' has no token"))
                })?;
                LoginOutcome {
                    credential: Credential::new(token),
                    expires_in: resp.expires_in,
                    identity: None,
                }
            }
        };

        // Persist first: a credential that cannot be stored is not adopted.
        self.storage.save(&outcome.credential)?;
        *self.identity.lock() = outcome.identity.clone();
        self.set_credential(Some(outcome.credential.clone()));

        tracing::info!(
            service = %service,
            api_key = api_key.is_some(),
            expires_in = ?outcome.expires_in,
            "logged in"
        );
        let method = if api_key.is_some() { "api_key" } else { "service_token" };
        TraceEvent::LoginCompleted {
            method: method.into(),
            service: api_key.is_none().then(|| service.to_owned()),
            expires_in: outcome.expires_in,
        }
        .emit();

        Ok(outcome)
    }

    /// Drop the credential and remove it from storage.  Cannot fail.
    pub fn logout(&self) {
        *self.identity.lock() = None;
        self.set_credential(None);
        if let Err(e) = self.storage.clear() {
            tracing::warn!(error = %e, "failed to clear stored credential");
        }
        TraceEvent::LoggedOut.emit();
    }

    // ── internals ────────────────────────────────────────────────────

    /// Publish a credential.  Returns `true` when the value changed.
    fn set_credential(&self, next: Option<Credential>) -> bool {
        self.credential.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }

    /// Forget a stored credential that failed verification.
    ///
    /// A login that completed while verification was in flight wins: only
    /// the rejected value is removed from state and storage.
    fn discard_rejected(&self, rejected: &Credential, reason: &str) {
        tracing::warn!(reason = %reason, "stored credential failed verification, discarding");
        TraceEvent::CredentialRejected {
            reason: reason.to_owned(),
        }
        .emit();

        let current = self.token();
        if current.is_some() && current.as_ref() != Some(rejected) {
            return;
        }
        *self.identity.lock() = None;
        self.set_credential(None);

        match self.storage.load() {
            Ok(Some(ref stored)) if stored != rejected => {}
            _ => {
                if let Err(e) = self.storage.clear() {
                    tracing::warn!(error = %e, "failed to clear rejected credential");
                }
            }
        }
    }
}
