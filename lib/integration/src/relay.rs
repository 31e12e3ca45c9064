//! Notification relay: a disposable inbox that buffers webhook deliveries.
//!
//! The dispatcher does not run an inbound HTTP server. Instead, webhooks are
//! pointed at a third-party inbox which we poll for what was delivered.

use crate::error::RelayError;
use crate::http::{HttpConfig, error_message, join_url};
use async_trait::async_trait;
use huddle_core::PersonId;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Relay connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the relay service.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "http://api.webhookinbox.com".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

/// A single buffered delivery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayItem {
    /// The raw request body as delivered by the webhook sender.
    #[serde(default)]
    pub body: String,
}

/// A call-membership change extracted from a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEvent {
    pub person_id: PersonId,
    pub status: String,
}

impl JoinEvent {
    /// Returns true if the membership transitioned to joined.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.status.eq_ignore_ascii_case("joined")
    }
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookData {
    person_id: PersonId,
    #[serde(default)]
    status: Option<String>,
}

impl RelayItem {
    /// Parses the delivered body as a call-membership webhook.
    ///
    /// A payload without a status is treated as joined, since watches only
    /// ever filter on the joined transition.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the body is not a membership webhook.
    pub fn join_event(&self) -> Result<JoinEvent, serde_json::Error> {
        let payload: WebhookPayload = serde_json::from_str(&self.body)?;
        Ok(JoinEvent {
            person_id: payload.data.person_id,
            status: payload
                .data
                .status
                .unwrap_or_else(|| "joined".to_string()),
        })
    }
}

/// Operations consumed from the notification relay.
#[async_trait]
pub trait NotificationRelay: Send + Sync {
    /// Provisions a fresh inbox and returns its base URL.
    async fn create_inbox(&self) -> Result<String, RelayError>;

    /// Returns every item buffered at the inbox, oldest first.
    async fn items(&self, base_url: &str) -> Result<Vec<RelayItem>, RelayError>;
}

/// Builds the delivery URL webhooks should target for an inbox.
#[must_use]
pub fn delivery_url(base_url: &str) -> String {
    join_url(base_url, "in/")
}

#[derive(Debug, Deserialize)]
struct CreatedInbox {
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<RelayItem>,
}

/// Client for the webhookinbox relay service.
#[derive(Clone)]
pub struct WebhookInbox {
    api_base: String,
    client: reqwest::Client,
}

impl WebhookInbox {
    /// Creates a relay client.
    #[must_use]
    pub fn new(config: &RelayConfig, http: &HttpConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            client: http.build_client(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RelayError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        Err(RelayError::Rejected {
            status,
            message: error_message(response).await,
        })
    }
}

#[async_trait]
impl NotificationRelay for WebhookInbox {
    #[instrument(skip(self))]
    async fn create_inbox(&self) -> Result<String, RelayError> {
        let response = self
            .client
            .post(join_url(&self.api_base, "create/"))
            .send()
            .await
            .map_err(|e| RelayError::Transport {
                reason: e.to_string(),
            })?;

        let created: CreatedInbox = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RelayError::Decode {
                reason: e.to_string(),
            })?;

        debug!(base_url = %created.base_url, "inbox provisioned");
        Ok(created.base_url)
    }

    #[instrument(skip(self))]
    async fn items(&self, base_url: &str) -> Result<Vec<RelayItem>, RelayError> {
        let response = self
            .client
            .get(join_url(base_url, "items/"))
            .send()
            .await
            .map_err(|e| RelayError::Transport {
                reason: e.to_string(),
            })?;

        let page: ItemsPage = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RelayError::Decode {
                reason: e.to_string(),
            })?;

        debug!(count = page.items.len(), "relay items fetched");
        Ok(page.items)
    }
}
