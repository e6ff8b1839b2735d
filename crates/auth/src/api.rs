//! The `AuthApi` trait defines the backend calls the session store needs
//! (REST in production, test doubles in unit tests).

use async_trait::async_trait;
use sa_domain::error::Result;

use crate::types::{Credential, TokenResponse, VerifyResponse};

/// Abstraction over the backend `/auth/*` surface.
///
/// Every method fails on a non-success response; 401/403 surface as
/// [`sa_domain::error::Error::Auth`].
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Check a bearer credential (GET /auth/verify, `Authorization: Bearer`).
    async fn verify_token(&self, credential: &Credential) -> Result<VerifyResponse>;

    /// Check an API key (GET /auth/verify?api_key=...).
    async fn verify_api_key(&self, api_key: &str) -> Result<VerifyResponse>;

    /// Request a token for a named service (GET /auth/token?service=...).
    async fn issue_token(&self, service: &str) -> Result<TokenResponse>;
}
