//! Collaboration platform interface.
//!
//! All directory, space, messaging and webhook operations the session needs
//! go through the [`Platform`] trait, so the orchestrator can be tested
//! without a live platform while production uses [`crate::WebexPlatform`].

use crate::error::PlatformError;
use crate::identity::AccessToken;
use async_trait::async_trait;
use huddle_core::{MembershipId, MessageId, PersonId, SpaceId, WatchId};
use serde::{Deserialize, Serialize};

/// A directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A conversation space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: SpaceId,
    #[serde(default)]
    pub title: String,
    /// The dialable SIP address; not returned on creation.
    #[serde(default)]
    pub sip_address: Option<String>,
}

/// A person's membership in a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: MembershipId,
    #[serde(rename = "roomId")]
    pub space_id: SpaceId,
    pub person_id: PersonId,
}

/// Where a message is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    /// Posted into a space.
    Space(SpaceId),
    /// Sent one-to-one to a person.
    Person(PersonId),
}

/// Definition of a webhook to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSpec {
    pub name: String,
    pub target_url: String,
    pub resource: String,
    pub event: String,
    pub filter: String,
}

impl WebhookSpec {
    /// Watches a single person's call membership becoming joined.
    #[must_use]
    pub fn call_joined(person: &PersonId, target_url: impl Into<String>) -> Self {
        Self {
            name: "huddleMember".to_string(),
            target_url: target_url.into(),
            resource: "callMemberships".to_string(),
            event: "updated".to_string(),
            filter: format!("personId={person}&status=joined"),
        }
    }
}

/// A registered webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: WatchId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_url: String,
    #[serde(default)]
    pub filter: Option<String>,
}

/// Operations consumed from the collaboration platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Installs the access token used by every subsequent call.
    async fn use_token(&self, token: AccessToken);

    /// Lists directory entries matching an email address.
    async fn find_people_by_email(&self, email: &str) -> Result<Vec<Person>, PlatformError>;

    /// Creates a space with the given title.
    async fn create_space(&self, title: &str) -> Result<Space, PlatformError>;

    /// Fetches a space's details, including its SIP address.
    async fn get_space(&self, space_id: &SpaceId) -> Result<Space, PlatformError>;

    /// Deletes a space and all of its memberships.
    async fn delete_space(&self, space_id: &SpaceId) -> Result<(), PlatformError>;

    /// Adds a person to a space.
    async fn create_membership(
        &self,
        space_id: &SpaceId,
        person_id: &PersonId,
    ) -> Result<Membership, PlatformError>;

    /// Posts a text message.
    async fn post_message(
        &self,
        target: &MessageTarget,
        text: &str,
    ) -> Result<MessageId, PlatformError>;

    /// Registers a webhook.
    async fn create_webhook(&self, spec: &WebhookSpec) -> Result<Webhook, PlatformError>;

    /// Deletes a webhook registration.
    async fn delete_webhook(&self, watch_id: &WatchId) -> Result<(), PlatformError>;
}
