//! REST implementation of [`AuthApi`].
//!
//! `RestAuthClient` wraps a `reqwest::Client` and translates every trait
//! method into the corresponding HTTP call against the backend.  Calls are
//! not retried: a failed login has to reach the caller, and a failed
//! startup verification simply drops the stored credential.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use sa_domain::config::ApiConfig;
use sa_domain::error::{Error, Result};
use sa_domain::trace::TraceEvent;
use uuid::Uuid;

use crate::api::AuthApi;
use crate::types::{Credential, TokenResponse, VerifyResponse};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the backend auth endpoints.
///
/// The underlying `reqwest::Client` maintains a connection pool, so one
/// instance should be shared for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct RestAuthClient {
    http: Client,
    base_url: String,
    client_type: String,
    timeout: Duration,
}

impl RestAuthClient {
    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a new client from the shared `ApiConfig`.
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let base_url = cfg.base_url.trim_end_matches('/').to_owned();

        Ok(Self {
            http,
            base_url,
            client_type: cfg.client_type.clone(),
            timeout,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard client headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        rb.header("X-Client-Type", &self.client_type)
            .header("X-Trace-Id", trace_id)
    }

    /// Build the full URL for a path like `/auth/verify`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request once and reject any non-success status.
    ///
    /// Emits a `TraceEvent::AuthCall` for every attempt, successful or not.
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(resp) => {
                let status = resp.status();

                TraceEvent::AuthCall {
                    endpoint: endpoint.to_owned(),
                    status: status.as_u16(),
                    duration_ms,
                }
                .emit();

                if status.is_success() {
                    return Ok(resp);
                }

                let body = resp.text().await.unwrap_or_default();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(Error::Auth(format!(
                        "{endpoint} rejected credentials ({}): {body}",
                        status.as_u16()
                    )));
                }
                Err(Error::Http(format!(
                    "{endpoint} returned {}: {body}",
                    status.as_u16()
                )))
            }
            Err(e) => {
                TraceEvent::AuthCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                Err(from_reqwest(e))
            }
        }
    }

    /// Decode a verify body, treating an empty or non-JSON body as "no details".
    async fn read_verify(resp: Response) -> Result<VerifyResponse> {
        let body = resp.text().await.map_err(from_reqwest)?;
        if body.trim().is_empty() {
            return Ok(VerifyResponse::default());
        }
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "verify response is not a JSON object, ignoring body");
            VerifyResponse::default()
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl AuthApi for RestAuthClient {
    async fn verify_token(&self, credential: &Credential) -> Result<VerifyResponse> {
        let url = self.url("/auth/verify");
        let resp = self
            .execute(
                "GET /auth/verify",
                self.http.get(&url).bearer_auth(credential.expose()),
            )
            .await?;
        Self::read_verify(resp).await
    }

    async fn verify_api_key(&self, api_key: &str) -> Result<VerifyResponse> {
        let url = self.url("/auth/verify");
        let resp = self
            .execute(
                "GET /auth/verify?api_key",
                self.http.get(&url).query(&[("api_key", api_key)]),
            )
            .await?;
        Self::read_verify(resp).await
    }

    async fn issue_token(&self, service: &str) -> Result<TokenResponse> {
        let url = self.url("/auth/token");
        let resp = self
            .execute(
                "GET /auth/token",
                self.http.get(&url).query(&[("service", service)]),
            )
            .await?;

        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("failed to parse token response: {e}")))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
