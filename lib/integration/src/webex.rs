//! REST implementation of [`Platform`] for Webex.

use crate::error::PlatformError;
use crate::http::{HttpConfig, error_message, join_url};
use crate::identity::AccessToken;
use crate::platform::{Membership, MessageTarget, Person, Platform, Space, Webhook, WebhookSpec};
use async_trait::async_trait;
use huddle_core::{MessageId, PersonId, SpaceId, WatchId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Collaboration platform connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://webexapis.com/v1".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: MessageId,
}

/// Webex REST client.
pub struct WebexPlatform {
    api_base: String,
    client: reqwest::Client,
    token: RwLock<Option<AccessToken>>,
}

impl WebexPlatform {
    /// Creates a client; a token must be installed with [`Platform::use_token`]
    /// before any other call.
    #[must_use]
    pub fn new(config: &PlatformConfig, http: &HttpConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            client: http.build_client(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.api_base, path)
    }

    async fn bearer(&self, operation: &'static str) -> Result<String, PlatformError> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| t.secret().to_string())
            .ok_or(PlatformError::Unauthorized { operation })
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PlatformError> {
        let token = self.bearer(operation).await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PlatformError::Transport {
                operation,
                reason: e.to_string(),
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        Err(PlatformError::Rejected {
            operation,
            status,
            message: error_message(response).await,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PlatformError> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PlatformError::Decode {
                operation,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Platform for WebexPlatform {
    async fn use_token(&self, token: AccessToken) {
        *self.token.write().await = Some(token);
    }

    #[instrument(skip(self))]
    async fn find_people_by_email(&self, email: &str) -> Result<Vec<Person>, PlatformError> {
        let request = self.client.get(self.url("people")).query(&[("email", email)]);
        let list: ItemList<Person> = self.send_json("list_people", request).await?;
        debug!(matches = list.items.len(), "directory lookup result");
        Ok(list.items)
    }

    #[instrument(skip(self))]
    async fn create_space(&self, title: &str) -> Result<Space, PlatformError> {
        let request = self
            .client
            .post(self.url("rooms"))
            .json(&json!({ "title": title }));
        self.send_json("create_space", request).await
    }

    #[instrument(skip(self), fields(space_id = %space_id))]
    async fn get_space(&self, space_id: &SpaceId) -> Result<Space, PlatformError> {
        let request = self
            .client
            .get(self.url(&format!("rooms/{space_id}")));
        self.send_json("get_space", request).await
    }

    #[instrument(skip(self), fields(space_id = %space_id))]
    async fn delete_space(&self, space_id: &SpaceId) -> Result<(), PlatformError> {
        let request = self
            .client
            .delete(self.url(&format!("rooms/{space_id}")));
        self.send("delete_space", request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(space_id = %space_id, person_id = %person_id))]
    async fn create_membership(
        &self,
        space_id: &SpaceId,
        person_id: &PersonId,
    ) -> Result<Membership, PlatformError> {
        let request = self.client.post(self.url("memberships")).json(&json!({
            "roomId": space_id,
            "personId": person_id,
        }));
        self.send_json("create_membership", request).await
    }

    #[instrument(skip(self, text))]
    async fn post_message(
        &self,
        target: &MessageTarget,
        text: &str,
    ) -> Result<MessageId, PlatformError> {
        let body = match target {
            MessageTarget::Space(space_id) => json!({ "roomId": space_id, "text": text }),
            MessageTarget::Person(person_id) => json!({ "toPersonId": person_id, "text": text }),
        };
        let request = self.client.post(self.url("messages")).json(&body);
        let created: CreatedMessage = self.send_json("post_message", request).await?;
        Ok(created.id)
    }

    #[instrument(skip(self), fields(filter = %spec.filter))]
    async fn create_webhook(&self, spec: &WebhookSpec) -> Result<Webhook, PlatformError> {
        let request = self.client.post(self.url("webhooks")).json(spec);
        self.send_json("create_webhook", request).await
    }

    #[instrument(skip(self), fields(watch_id = %watch_id))]
    async fn delete_webhook(&self, watch_id: &WatchId) -> Result<(), PlatformError> {
        let request = self
            .client
            .delete(self.url(&format!("webhooks/{watch_id}")));
        self.send("delete_webhook", request).await?;
        Ok(())
    }
}
