//! Space manager: the shared conversation space, its members and messages.

use crate::error::SessionError;
use futures::future::join_all;
use huddle_core::{MessageId, PersonId, SpaceId};
use huddle_integration::{Membership, MessageTarget, Platform, PlatformError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Creates, populates and removes the conversation space.
#[derive(Clone)]
pub struct SpaceManager {
    platform: Arc<dyn Platform>,
}

impl SpaceManager {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// Creates an empty space.
    ///
    /// # Errors
    ///
    /// Returns `SpaceCreate` if the platform rejects the request.
    #[instrument(skip(self))]
    pub async fn create_space(&self, title: &str) -> Result<SpaceId, SessionError> {
        let space = self
            .platform
            .create_space(title)
            .await
            .map_err(SessionError::SpaceCreate)?;
        info!(space_id = %space.id, "space created");
        Ok(space.id)
    }

    /// Looks up the dialable address of a space.
    ///
    /// Creation does not return the address, so this is a separate round
    /// trip. `retries` extra attempts are made `delay` apart when the space is
    /// not visible yet or has no address.
    ///
    /// # Errors
    ///
    /// Returns `SpaceLookup` once every attempt has failed.
    #[instrument(skip(self), fields(space_id = %space_id))]
    pub async fn space_address(
        &self,
        space_id: &SpaceId,
        retries: u32,
        delay: Duration,
    ) -> Result<String, SessionError> {
        let mut attempt = 0;
        loop {
            let reason = match self.platform.get_space(space_id).await {
                Ok(space) => match space.sip_address.filter(|a| !a.trim().is_empty()) {
                    Some(address) => {
                        debug!(%address, "space address known");
                        return Ok(address);
                    }
                    None => "space has no call address".to_string(),
                },
                Err(e) => e.to_string(),
            };

            if attempt >= retries {
                return Err(SessionError::SpaceLookup {
                    space_id: space_id.clone(),
                    reason,
                });
            }
            attempt += 1;
            warn!(attempt, %reason, "space address not available yet, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    /// Adds every participant to the space.
    ///
    /// All additions run concurrently and settle before returning; any single
    /// failure fails the whole stage. Memberships already created are not
    /// rolled back here, removing the space removes them.
    ///
    /// # Errors
    ///
    /// Returns `Membership` naming the first participant, in invitation
    /// order, that could not be added.
    #[instrument(skip(self, participants), fields(space_id = %space_id, count = participants.len()))]
    pub async fn add_members(
        &self,
        space_id: &SpaceId,
        participants: &[PersonId],
    ) -> Result<Vec<Membership>, SessionError> {
        let additions = participants.iter().map(|person_id| async move {
            self.platform
                .create_membership(space_id, person_id)
                .await
                .map_err(|source| SessionError::Membership {
                    person_id: person_id.clone(),
                    source,
                })
        });

        let memberships = join_all(additions)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        info!(members = memberships.len(), "members added");
        Ok(memberships)
    }

    /// Posts a message into the space.
    ///
    /// # Errors
    ///
    /// Returns the platform error; the caller decides whether it matters.
    pub async fn post_message(
        &self,
        space_id: &SpaceId,
        text: &str,
    ) -> Result<MessageId, PlatformError> {
        self.platform
            .post_message(&MessageTarget::Space(space_id.clone()), text)
            .await
    }

    /// Sends a one-to-one message to a participant.
    ///
    /// # Errors
    ///
    /// Returns the platform error; the caller decides whether it matters.
    pub async fn direct_message(
        &self,
        person_id: &PersonId,
        text: &str,
    ) -> Result<MessageId, PlatformError> {
        self.platform
            .post_message(&MessageTarget::Person(person_id.clone()), text)
            .await
    }

    /// Deletes the space along with its memberships.
    ///
    /// # Errors
    ///
    /// Returns the platform error, including for a space that no longer exists.
    #[instrument(skip(self), fields(space_id = %space_id))]
    pub async fn remove_space(&self, space_id: &SpaceId) -> Result<(), PlatformError> {
        self.platform.delete_space(space_id).await?;
        info!("space removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn people(ids: &[&str]) -> Vec<PersonId> {
        ids.iter().map(|id| PersonId::new(*id)).collect()
    }

    #[tokio::test]
    async fn create_then_lookup_address() {
        let backend = FakeBackend::new();
        let spaces = SpaceManager::new(backend.clone());

        let space_id = spaces.create_space("Incident 112").await.expect("create");
        let address = spaces
            .space_address(&space_id, 0, Duration::ZERO)
            .await
            .expect("address");

        assert!(backend.space_exists(&space_id));
        assert_eq!(address, format!("{space_id}@meet.example.com"));
    }

    #[tokio::test]
    async fn create_failure_is_space_create_error() {
        let backend = FakeBackend::new();
        backend.fail_space_creation();
        let spaces = SpaceManager::new(backend);

        let err = spaces.create_space("x").await.unwrap_err();
        assert_eq!(err.kind(), "space_create");
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_retries_until_address_is_visible() {
        let backend = FakeBackend::new();
        let spaces = SpaceManager::new(backend.clone());
        let space_id = spaces.create_space("x").await.expect("create");
        backend.hide_space_address_for(2);

        let err = spaces
            .space_address(&space_id, 1, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "space_lookup");

        let address = spaces
            .space_address(&space_id, 3, Duration::from_secs(1))
            .await
            .expect("address after retry");
        assert!(address.ends_with("@meet.example.com"));
    }

    #[tokio::test]
    async fn lookup_of_missing_space_fails() {
        let spaces = SpaceManager::new(FakeBackend::new());
        let err = spaces
            .space_address(&SpaceId::new("room-404"), 0, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SpaceLookup { .. }));
    }

    #[tokio::test]
    async fn add_members_is_all_or_fail() {
        let backend = FakeBackend::new();
        let spaces = SpaceManager::new(backend.clone());
        let space_id = spaces.create_space("x").await.expect("create");

        let added = spaces
            .add_members(&space_id, &people(&["p-a", "p-b"]))
            .await
            .expect("add");
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].person_id, PersonId::new("p-a"));
        assert_eq!(backend.members_of(&space_id), people(&["p-a", "p-b"]));

        backend.fail_membership_for("p-d");
        let err = spaces
            .add_members(&space_id, &people(&["p-c", "p-d", "p-e"]))
            .await
            .unwrap_err();
        match err {
            SessionError::Membership { person_id, .. } => {
                assert_eq!(person_id, PersonId::new("p-d"));
            }
            other => panic!("expected membership error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn messages_and_removal() {
        let backend = FakeBackend::new();
        let spaces = SpaceManager::new(backend.clone());
        let space_id = spaces.create_space("x").await.expect("create");

        spaces.post_message(&space_id, "hello").await.expect("post");
        spaces
            .direct_message(&PersonId::new("p-a"), "join")
            .await
            .expect("dm");
        assert_eq!(backend.space_messages(), vec!["hello".to_string()]);
        assert_eq!(backend.direct_messages(), people(&["p-a"]));

        spaces.remove_space(&space_id).await.expect("remove");
        assert!(!backend.space_exists(&space_id));
        assert!(spaces.remove_space(&space_id).await.is_err());
    }
}
