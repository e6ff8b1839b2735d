//! Credential types and the wire DTOs of the `/auth/*` endpoints.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credential
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An opaque bearer token.
///
/// `Debug` never prints the value; call [`Credential::expose`] where the raw
/// token is actually needed (headers, connect URLs, storage).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Who the backend says the credential belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionIdentity {
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire DTOs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Response body of `GET /auth/token`.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Response body of `GET /auth/verify`.
///
/// Every field is optional: a bare `200` with an empty body is still a
/// successful verification.
#[derive(Clone, Default, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub authenticated: Option<bool>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Replacement token handed back when verifying an API key.
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for VerifyResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyResponse")
            .field("authenticated", &self.authenticated)
            .field("user", &self.user)
            .field("scopes", &self.scopes)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl VerifyResponse {
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            user: self.user.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub credential: Credential,
    /// Lifetime hint from the issuance endpoint, in seconds.
    pub expires_in: Option<u64>,
    pub identity: Option<SessionIdentity>,
}
