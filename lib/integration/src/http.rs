//! Shared HTTP plumbing for the REST clients.

use serde::Deserialize;
use std::time::Duration;

/// HTTP client settings shared by every remote client.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl HttpConfig {
    /// Builds a `reqwest` client honoring these settings.
    #[must_use]
    pub fn build_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    }
}

/// Joins a base URL and a path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Reads a failed response body, preferring a JSON `message` field.
pub(crate) async fn error_message(response: reqwest::Response) -> String {
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return format!("failed reading error body: {e}"),
    };
    serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string())
}
