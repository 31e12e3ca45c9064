//! In-memory collaborators for exercising the session crate.
//!
//! `FakeBackend` implements every collaborator trait over one shared state so
//! tests can script failures and inspect what was left behind.

use crate::dispatcher::CallProfile;
use async_trait::async_trait;
use huddle_core::{CallLegId, MembershipId, MessageId, PersonId, SpaceId, WatchId};
use huddle_integration::{
    AccessToken, CallRequest, IdentityError, IdentityProvider, Membership, MessageTarget,
    NotificationRelay, Person, Platform, PlatformError, RelayError, RelayItem, Space, Telephony,
    TelephonyError, Webhook, WebhookSpec,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub(crate) fn test_profile() -> CallProfile {
    CallProfile {
        call_flow_url: "https://flows.example.com/huddle.xml".to_string(),
        caller_id: "HuddleDispatcher".to_string(),
    }
}

#[derive(Debug)]
struct CallRecord {
    to: String,
    completed: bool,
}

#[derive(Default)]
struct State {
    next_id: u64,

    fail_identity: bool,
    token: Option<AccessToken>,

    directory: HashMap<String, Vec<PersonId>>,
    directory_lookups: usize,

    fail_space_creation: bool,
    fail_space_deletion: bool,
    hide_address_for: usize,
    spaces: BTreeMap<SpaceId, Space>,
    members: HashMap<SpaceId, Vec<PersonId>>,
    fail_membership_for: HashSet<PersonId>,

    fail_welcome: bool,
    fail_direct_to: HashSet<PersonId>,
    space_messages: Vec<String>,
    direct_messages: Vec<PersonId>,
    join_when_reminded: HashSet<PersonId>,

    webhooks: BTreeMap<WatchId, WebhookSpec>,
    fail_webhook_for: HashSet<PersonId>,
    fail_webhook_deletion: HashSet<WatchId>,

    fail_inbox_creation: bool,
    fail_relay_reads: bool,
    fail_relay_reads_after: Option<usize>,
    relay_items: Vec<RelayItem>,
    relay_polls: Vec<Instant>,

    fail_calls: bool,
    fail_call_completion: bool,
    calls: BTreeMap<CallLegId, CallRecord>,
    dialed: Vec<String>,
    call_placed_at: Option<Instant>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_event(&mut self, person_id: &str, status: &str) {
        let body = serde_json::json!({
            "id": format!("evt-{}", self.relay_items.len() + 1),
            "resource": "callMemberships",
            "event": "updated",
            "data": { "personId": person_id, "status": status },
        });
        self.relay_items.push(RelayItem {
            body: body.to_string(),
        });
    }
}

/// Scriptable stand-in for the identity provider, platform, relay and
/// telephony provider.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

fn rejected(operation: &'static str, status: u16, message: &str) -> PlatformError {
    PlatformError::Rejected {
        operation,
        status,
        message: message.to_string(),
    }
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a backend whose directory maps each email to the given ids.
    pub(crate) fn with_directory(entries: &[(&str, &[&str])]) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            for (email, ids) in entries {
                state.directory.insert(
                    email.to_ascii_lowercase(),
                    ids.iter().map(|id| PersonId::new(*id)).collect(),
                );
            }
        }
        Arc::new(backend)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    // Scripting

    pub(crate) fn fail_identity(&self) {
        self.with_state(|s| s.fail_identity = true);
    }

    pub(crate) fn fail_space_creation(&self) {
        self.with_state(|s| s.fail_space_creation = true);
    }

    pub(crate) fn fail_space_deletion(&self) {
        self.with_state(|s| s.fail_space_deletion = true);
    }

    /// The next `lookups` space reads report no call address.
    pub(crate) fn hide_space_address_for(&self, lookups: usize) {
        self.with_state(|s| s.hide_address_for = lookups);
    }

    pub(crate) fn fail_membership_for(&self, person_id: &str) {
        self.with_state(|s| s.fail_membership_for.insert(PersonId::new(person_id)));
    }

    pub(crate) fn fail_welcome(&self) {
        self.with_state(|s| s.fail_welcome = true);
    }

    pub(crate) fn fail_direct_message_to(&self, person_id: &str) {
        self.with_state(|s| s.fail_direct_to.insert(PersonId::new(person_id)));
    }

    /// Delivers a join event for `person_id` as soon as they are reminded.
    pub(crate) fn join_when_reminded(&self, person_id: &str) {
        self.with_state(|s| s.join_when_reminded.insert(PersonId::new(person_id)));
    }

    pub(crate) fn fail_webhook_for(&self, person_id: &str) {
        self.with_state(|s| s.fail_webhook_for.insert(PersonId::new(person_id)));
    }

    pub(crate) fn fail_webhook_deletion(&self, watch_id: &WatchId) {
        self.with_state(|s| s.fail_webhook_deletion.insert(watch_id.clone()));
    }

    pub(crate) fn fail_inbox_creation(&self) {
        self.with_state(|s| s.fail_inbox_creation = true);
    }

    pub(crate) fn fail_relay_reads(&self) {
        self.with_state(|s| s.fail_relay_reads = true);
    }

    /// Relay reads succeed `reads` times and fail afterwards.
    pub(crate) fn fail_relay_reads_after(&self, reads: usize) {
        self.with_state(|s| s.fail_relay_reads_after = Some(reads));
    }

    pub(crate) fn deliver_join(&self, person_id: &str) {
        self.with_state(|s| s.push_event(person_id, "joined"));
    }

    pub(crate) fn deliver_status(&self, person_id: &str, status: &str) {
        self.with_state(|s| s.push_event(person_id, status));
    }

    pub(crate) fn deliver_raw(&self, body: &str) {
        self.with_state(|s| {
            s.relay_items.push(RelayItem {
                body: body.to_string(),
            });
        });
    }

    pub(crate) fn fail_calls(&self) {
        self.with_state(|s| s.fail_calls = true);
    }

    pub(crate) fn fail_call_completion(&self) {
        self.with_state(|s| s.fail_call_completion = true);
    }

    // Inspection

    pub(crate) fn token_installed(&self) -> bool {
        self.with_state(|s| s.token.is_some())
    }

    pub(crate) fn directory_lookups(&self) -> usize {
        self.with_state(|s| s.directory_lookups)
    }

    pub(crate) fn space_exists(&self, space_id: &SpaceId) -> bool {
        self.with_state(|s| s.spaces.contains_key(space_id))
    }

    pub(crate) fn space_count(&self) -> usize {
        self.with_state(|s| s.spaces.len())
    }

    pub(crate) fn members_of(&self, space_id: &SpaceId) -> Vec<PersonId> {
        self.with_state(|s| s.members.get(space_id).cloned().unwrap_or_default())
    }

    pub(crate) fn space_messages(&self) -> Vec<String> {
        self.with_state(|s| s.space_messages.clone())
    }

    pub(crate) fn direct_messages(&self) -> Vec<PersonId> {
        self.with_state(|s| s.direct_messages.clone())
    }

    pub(crate) fn webhook_count(&self) -> usize {
        self.with_state(|s| s.webhooks.len())
    }

    pub(crate) fn webhook_filters(&self) -> Vec<String> {
        self.with_state(|s| s.webhooks.values().map(|w| w.filter.clone()).collect())
    }

    pub(crate) fn webhook_targets(&self) -> Vec<String> {
        self.with_state(|s| s.webhooks.values().map(|w| w.target_url.clone()).collect())
    }

    pub(crate) fn relay_polls(&self) -> Vec<Instant> {
        self.with_state(|s| s.relay_polls.clone())
    }

    pub(crate) fn call_placed_at(&self) -> Option<Instant> {
        self.with_state(|s| s.call_placed_at)
    }

    pub(crate) fn dialed(&self) -> Vec<String> {
        self.with_state(|s| s.dialed.clone())
    }

    pub(crate) fn call_completed(&self, leg: &CallLegId) -> bool {
        self.with_state(|s| s.calls.get(leg).is_some_and(|c| c.completed))
    }

    pub(crate) fn active_calls(&self) -> usize {
        self.with_state(|s| s.calls.values().filter(|c| !c.completed).count())
    }
}

#[async_trait]
impl IdentityProvider for FakeBackend {
    async fn authorize(&self) -> Result<AccessToken, IdentityError> {
        self.with_state(|s| {
            if s.fail_identity {
                return Err(IdentityError::Rejected {
                    status: 401,
                    message: "invalid guest token".to_string(),
                });
            }
            Ok(AccessToken::new("fake-access-token", None))
        })
    }
}

#[async_trait]
impl Platform for FakeBackend {
    async fn use_token(&self, token: AccessToken) {
        self.with_state(|s| s.token = Some(token));
    }

    async fn find_people_by_email(&self, email: &str) -> Result<Vec<Person>, PlatformError> {
        self.with_state(|s| {
            s.directory_lookups += 1;
            let ids = s
                .directory
                .get(&email.to_ascii_lowercase())
                .cloned()
                .unwrap_or_default();
            Ok(ids
                .into_iter()
                .map(|id| Person {
                    id,
                    emails: vec![email.to_string()],
                    display_name: None,
                })
                .collect())
        })
    }

    async fn create_space(&self, title: &str) -> Result<Space, PlatformError> {
        self.with_state(|s| {
            if s.fail_space_creation {
                return Err(rejected("create_space", 500, "space service unavailable"));
            }
            let id = SpaceId::new(format!("room-{}", s.next_id()));
            let space = Space {
                id: id.clone(),
                title: title.to_string(),
                sip_address: Some(format!("{id}@meet.example.com")),
            };
            s.spaces.insert(id, space.clone());
            Ok(Space {
                sip_address: None,
                ..space
            })
        })
    }

    async fn get_space(&self, space_id: &SpaceId) -> Result<Space, PlatformError> {
        self.with_state(|s| {
            let mut space = s
                .spaces
                .get(space_id)
                .cloned()
                .ok_or_else(|| rejected("get_space", 404, "space not found"))?;
            if s.hide_address_for > 0 {
                s.hide_address_for -= 1;
                space.sip_address = None;
            }
            Ok(space)
        })
    }

    async fn delete_space(&self, space_id: &SpaceId) -> Result<(), PlatformError> {
        self.with_state(|s| {
            if s.fail_space_deletion {
                return Err(rejected("delete_space", 503, "try again later"));
            }
            s.spaces
                .remove(space_id)
                .ok_or_else(|| rejected("delete_space", 404, "space not found"))?;
            s.members.remove(space_id);
            Ok(())
        })
    }

    async fn create_membership(
        &self,
        space_id: &SpaceId,
        person_id: &PersonId,
    ) -> Result<Membership, PlatformError> {
        self.with_state(|s| {
            if s.fail_membership_for.contains(person_id) {
                return Err(rejected("create_membership", 403, "person cannot be added"));
            }
            if !s.spaces.contains_key(space_id) {
                return Err(rejected("create_membership", 404, "space not found"));
            }
            let id = MembershipId::new(format!("mem-{}", s.next_id()));
            s.members
                .entry(space_id.clone())
                .or_default()
                .push(person_id.clone());
            Ok(Membership {
                id,
                space_id: space_id.clone(),
                person_id: person_id.clone(),
            })
        })
    }

    async fn post_message(
        &self,
        target: &MessageTarget,
        text: &str,
    ) -> Result<MessageId, PlatformError> {
        self.with_state(|s| {
            match target {
                MessageTarget::Space(space_id) => {
                    if s.fail_welcome {
                        return Err(rejected("post_message", 500, "message service down"));
                    }
                    if !s.spaces.contains_key(space_id) {
                        return Err(rejected("post_message", 404, "space not found"));
                    }
                    s.space_messages.push(text.to_string());
                }
                MessageTarget::Person(person_id) => {
                    if s.fail_direct_to.contains(person_id) {
                        return Err(rejected("post_message", 403, "recipient blocked messages"));
                    }
                    s.direct_messages.push(person_id.clone());
                    if s.join_when_reminded.contains(person_id) {
                        let person = person_id.to_string();
                        s.push_event(&person, "joined");
                    }
                }
            }
            Ok(MessageId::new(format!("msg-{}", s.next_id())))
        })
    }

    async fn create_webhook(&self, spec: &WebhookSpec) -> Result<Webhook, PlatformError> {
        self.with_state(|s| {
            let refused = s
                .fail_webhook_for
                .iter()
                .any(|p| spec.filter.starts_with(&format!("personId={p}&")));
            if refused {
                return Err(rejected("create_webhook", 400, "invalid filter"));
            }
            let id = WatchId::new(format!("wh-{}", s.next_id()));
            s.webhooks.insert(id.clone(), spec.clone());
            Ok(Webhook {
                id,
                name: spec.name.clone(),
                target_url: spec.target_url.clone(),
                filter: Some(spec.filter.clone()),
            })
        })
    }

    async fn delete_webhook(&self, watch_id: &WatchId) -> Result<(), PlatformError> {
        self.with_state(|s| {
            if s.fail_webhook_deletion.contains(watch_id) {
                return Err(rejected("delete_webhook", 500, "internal error"));
            }
            s.webhooks
                .remove(watch_id)
                .map(|_| ())
                .ok_or_else(|| rejected("delete_webhook", 404, "webhook not found"))
        })
    }
}

#[async_trait]
impl NotificationRelay for FakeBackend {
    async fn create_inbox(&self) -> Result<String, RelayError> {
        self.with_state(|s| {
            if s.fail_inbox_creation {
                return Err(RelayError::Rejected {
                    status: 503,
                    message: "no capacity".to_string(),
                });
            }
            Ok(format!("http://relay.test/i/{}/", s.next_id()))
        })
    }

    async fn items(&self, _base_url: &str) -> Result<Vec<RelayItem>, RelayError> {
        self.with_state(|s| {
            let exhausted = s
                .fail_relay_reads_after
                .is_some_and(|reads| s.relay_polls.len() >= reads);
            s.relay_polls.push(Instant::now());
            if s.fail_relay_reads || exhausted {
                return Err(RelayError::Transport {
                    reason: "connection reset".to_string(),
                });
            }
            Ok(s.relay_items.clone())
        })
    }
}

#[async_trait]
impl Telephony for FakeBackend {
    async fn place_call(&self, request: &CallRequest) -> Result<CallLegId, TelephonyError> {
        self.with_state(|s| {
            if s.fail_calls {
                return Err(TelephonyError::Rejected {
                    operation: "place_call",
                    status: 400,
                    message: "invalid To address".to_string(),
                });
            }
            let leg = CallLegId::new(format!("CA{:032}", s.next_id()));
            s.dialed.push(request.to.clone());
            s.call_placed_at = Some(Instant::now());
            s.calls.insert(
                leg.clone(),
                CallRecord {
                    to: request.to.clone(),
                    completed: false,
                },
            );
            Ok(leg)
        })
    }

    async fn complete_call(&self, leg: &CallLegId) -> Result<(), TelephonyError> {
        self.with_state(|s| {
            if s.fail_call_completion {
                return Err(TelephonyError::Transport {
                    operation: "complete_call",
                    reason: "timed out".to_string(),
                });
            }
            let call = s.calls.get_mut(leg).ok_or(TelephonyError::Rejected {
                operation: "complete_call",
                status: 404,
                message: "call not found".to_string(),
            })?;
            call.completed = true;
            tracing::debug!(to = %call.to, "fake call completed");
            Ok(())
        })
    }
}
