//! The session value threaded through the orchestrator.
//!
//! A `Session` records what every completed stage produced, so cleanup can
//! release exactly the remote resources that exist, whichever stage the
//! session stopped at.

use crate::error::SessionError;
use crate::state::SessionState;
use huddle_core::{CallLegId, PersonId, SessionId, SpaceId, WatchId};
use std::collections::BTreeSet;

/// One huddle: its roster, its remote resources and how far it got.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    title: String,
    contacts: Vec<String>,
    state: SessionState,
    failed_stage: Option<SessionState>,
    relay_base_url: Option<String>,
    invited: Vec<PersonId>,
    remaining: Vec<PersonId>,
    observed: BTreeSet<PersonId>,
    space_id: Option<SpaceId>,
    call_address: Option<String>,
    call_leg: Option<CallLegId>,
    call_ended: bool,
    watches: Vec<WatchId>,
}

impl Session {
    /// Creates a session in `Init`.
    #[must_use]
    pub fn new(title: impl Into<String>, contacts: Vec<String>) -> Self {
        Self {
            id: SessionId::new(),
            title: title.into(),
            contacts,
            state: SessionState::Init,
            failed_stage: None,
            relay_base_url: None,
            invited: Vec::new(),
            remaining: Vec::new(),
            observed: BTreeSet::new(),
            space_id: None,
            call_address: None,
            call_leg: None,
            call_ended: false,
            watches: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn contacts(&self) -> &[String] {
        &self.contacts
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The stage that was running when the session aborted.
    #[must_use]
    pub fn failed_stage(&self) -> Option<SessionState> {
        self.failed_stage
    }

    #[must_use]
    pub fn relay_base_url(&self) -> Option<&str> {
        self.relay_base_url.as_deref()
    }

    /// Participants in invitation order.
    #[must_use]
    pub fn invited(&self) -> &[PersonId] {
        &self.invited
    }

    /// Invited participants not yet observed joining, in invitation order.
    #[must_use]
    pub fn remaining(&self) -> &[PersonId] {
        &self.remaining
    }

    /// Every participant observed joining so far.
    #[must_use]
    pub fn observed(&self) -> &BTreeSet<PersonId> {
        &self.observed
    }

    /// The space, while it exists.
    #[must_use]
    pub fn space_id(&self) -> Option<&SpaceId> {
        self.space_id.as_ref()
    }

    #[must_use]
    pub fn call_address(&self) -> Option<&str> {
        self.call_address.as_deref()
    }

    /// The call leg, while it has not been ended.
    #[must_use]
    pub fn active_call_leg(&self) -> Option<&CallLegId> {
        self.call_leg.as_ref().filter(|_| !self.call_ended)
    }

    /// The call leg placed for this session, ended or not.
    #[must_use]
    pub fn call_leg(&self) -> Option<&CallLegId> {
        self.call_leg.as_ref()
    }

    /// Watch registrations not yet removed.
    #[must_use]
    pub fn watches(&self) -> &[WatchId] {
        &self.watches
    }

    /// Returns true once no remote resource is left to release.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.space_id.is_none() && self.active_call_leg().is_none() && self.watches.is_empty()
    }

    /// Moves to the next stage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless `to` directly follows the current state.
    pub fn advance(&mut self, to: SessionState) -> Result<(), SessionError> {
        if self.state.next() != Some(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Moves to `Aborted`, remembering the stage that was running.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.failed_stage = self.state.next();
        self.state = SessionState::Aborted;
    }

    pub(crate) fn set_relay_base_url(&mut self, base_url: String) {
        self.relay_base_url = Some(base_url);
    }

    pub(crate) fn set_invited(&mut self, invited: Vec<PersonId>) {
        self.remaining = invited.clone();
        self.invited = invited;
    }

    pub(crate) fn set_space(&mut self, space_id: SpaceId) {
        self.space_id = Some(space_id);
    }

    pub(crate) fn set_call_address(&mut self, address: String) {
        self.call_address = Some(address);
    }

    pub(crate) fn set_call_leg(&mut self, leg: CallLegId) {
        self.call_leg = Some(leg);
        self.call_ended = false;
    }

    pub(crate) fn add_watches(&mut self, watches: impl IntoIterator<Item = WatchId>) {
        self.watches.extend(watches);
    }

    /// Folds newly observed joiners in and recomputes who remains.
    pub(crate) fn record_joiners(&mut self, joiners: impl IntoIterator<Item = PersonId>) {
        self.observed.extend(joiners);
        self.remaining = crate::watcher::reconcile(&self.invited, &self.observed);
    }

    pub(crate) fn mark_call_ended(&mut self) {
        self.call_ended = true;
    }

    pub(crate) fn clear_space(&mut self) {
        self.space_id = None;
    }

    pub(crate) fn retain_watches(&mut self, still_registered: &[WatchId]) {
        self.watches.retain(|w| still_registered.contains(w));
    }
}
