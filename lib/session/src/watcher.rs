//! Join-event watcher.
//!
//! Registers one webhook per participant that fires when their call
//! membership becomes joined, points every webhook at a relay inbox, and
//! later reads the inbox to work out who has not joined.

use crate::error::SessionError;
use futures::future::join_all;
use huddle_core::{PersonId, WatchId};
use huddle_integration::relay::delivery_url;
use huddle_integration::{NotificationRelay, Platform, PlatformError, RelayError, WebhookSpec};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Registration results when at least one registration failed.
///
/// `registered` still lists what succeeded so it can be torn down.
#[derive(Debug)]
pub struct PartialRegistration {
    pub registered: Vec<WatchId>,
    pub error: SessionError,
}

/// Result of removing watch registrations.
#[derive(Debug, Default)]
pub struct WatchTeardown {
    pub removed: Vec<WatchId>,
    pub failed: Vec<(WatchId, PlatformError)>,
}

impl WatchTeardown {
    /// Returns true if every registration was removed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Returns invited participants not in `observed`, in invitation order.
#[must_use]
pub fn reconcile(invited: &[PersonId], observed: &BTreeSet<PersonId>) -> Vec<PersonId> {
    invited
        .iter()
        .filter(|person| !observed.contains(*person))
        .cloned()
        .collect()
}

/// Watches for participants joining the call.
#[derive(Clone)]
pub struct JoinEventWatcher {
    platform: Arc<dyn Platform>,
    relay: Arc<dyn NotificationRelay>,
}

impl JoinEventWatcher {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>, relay: Arc<dyn NotificationRelay>) -> Self {
        Self { platform, relay }
    }

    /// Obtains a fresh relay inbox and returns its base URL.
    ///
    /// # Errors
    ///
    /// Returns `Relay` if the inbox cannot be created.
    #[instrument(skip(self))]
    pub async fn provision_inbox(&self) -> Result<String, SessionError> {
        let base_url = self
            .relay
            .create_inbox()
            .await
            .map_err(SessionError::Relay)?;
        info!(%base_url, "relay inbox ready");
        Ok(base_url)
    }

    /// Registers a join watch for one participant.
    ///
    /// # Errors
    ///
    /// Returns `WatchRegistration` if the platform rejects the webhook.
    pub async fn register_watch(
        &self,
        person_id: &PersonId,
        relay_base_url: &str,
    ) -> Result<WatchId, SessionError> {
        let spec = WebhookSpec::call_joined(person_id, delivery_url(relay_base_url));
        self.platform
            .create_webhook(&spec)
            .await
            .map(|webhook| webhook.id)
            .map_err(|source| SessionError::WatchRegistration {
                person_id: person_id.clone(),
                source,
            })
    }

    /// Registers join watches for every participant.
    ///
    /// Partial coverage is not acceptable since it would under-report who
    /// never joined, so any failure fails the stage.
    ///
    /// # Errors
    ///
    /// Returns the watches that did register together with the first
    /// failure in invitation order.
    #[instrument(skip(self, participants), fields(count = participants.len()))]
    pub async fn register_watches(
        &self,
        participants: &[PersonId],
        relay_base_url: &str,
    ) -> Result<Vec<WatchId>, PartialRegistration> {
        let results = join_all(
            participants
                .iter()
                .map(|person_id| self.register_watch(person_id, relay_base_url)),
        )
        .await;

        let mut registered = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(watch_id) => registered.push(watch_id),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!(error = %e, "additional watch registration failure"),
            }
        }

        match first_error {
            None => {
                info!(watches = registered.len(), "join watches registered");
                Ok(registered)
            }
            Some(error) => Err(PartialRegistration { registered, error }),
        }
    }

    /// Reads every event buffered at the relay and returns who joined.
    ///
    /// The read does not consume events, so polling again without new
    /// deliveries yields the same set. Items that are not join events are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns the relay error if the inbox cannot be read; whether that is
    /// fatal depends on the stage polling.
    #[instrument(skip(self))]
    pub async fn poll_delivered_events(
        &self,
        relay_base_url: &str,
    ) -> Result<BTreeSet<PersonId>, RelayError> {
        let items = self.relay.items(relay_base_url).await?;

        let mut joined = BTreeSet::new();
        for item in &items {
            match item.join_event() {
                Ok(event) if event.is_joined() => {
                    joined.insert(event.person_id);
                }
                Ok(event) => {
                    debug!(person_id = %event.person_id, status = %event.status, "ignoring non-join event");
                }
                Err(e) => warn!(error = %e, "skipping relay item that is not a membership event"),
            }
        }

        debug!(items = items.len(), joined = joined.len(), "relay polled");
        Ok(joined)
    }

    /// Removes every watch registration, attempting all of them.
    #[instrument(skip(self, watches), fields(count = watches.len()))]
    pub async fn teardown_watches(&self, watches: &[WatchId]) -> WatchTeardown {
        let results = join_all(watches.iter().map(|watch_id| async move {
            (
                watch_id.clone(),
                self.platform.delete_webhook(watch_id).await,
            )
        }))
        .await;

        let mut teardown = WatchTeardown::default();
        for (watch_id, result) in results {
            match result {
                Ok(()) => teardown.removed.push(watch_id),
                Err(e) => {
                    warn!(%watch_id, error = %e, "watch registration not removed");
                    teardown.failed.push((watch_id, e));
                }
            }
        }
        teardown
    }
}
