use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend HTTP API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the `/auth/*` paths are appended to.
    /// Overridden by `SA_API_URL`.
    #[serde(default = "d_api_url")]
    pub base_url: String,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
    /// Sent as `X-Client-Type` on every request.
    #[serde(default = "d_client_type")]
    pub client_type: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: d_api_url(),
            timeout_ms: 10_000,
            client_type: d_client_type(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_url() -> String {
    "http://localhost:8000/api/v1".into()
}
fn d_10000() -> u64 {
    10_000
}
fn d_client_type() -> String {
    "sa-client".into()
}
