//! Error types for the session crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ResolutionError`: A contact could not be mapped to exactly one person
//! - `SessionError`: A fatal stage failure; the first one aborts the session
//! - `SessionWarning`: A best-effort step failed; the session carried on
//!
//! Collaborator errors from `huddle-integration` are carried inside the
//! variant naming the stage they broke.

use crate::state::SessionState;
use huddle_core::{CallLegId, PersonId, SpaceId, WatchId};
use huddle_integration::{IdentityError, PlatformError, RelayError, TelephonyError};
use std::fmt;

/// Errors from resolving contacts to directory entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// No contacts were supplied.
    NoContacts,
    /// A contact is empty or whitespace.
    BlankContact { position: usize },
    /// The same contact appears more than once.
    DuplicateContact { contact: String },
    /// A contact resolved to a person an earlier contact already resolved to.
    DuplicateParticipant { contact: String, person_id: PersonId },
    /// No directory entry matches the contact.
    NotFound { contact: String },
    /// More than one directory entry matches the contact.
    Ambiguous { contact: String, matches: usize },
    /// The directory lookup itself failed.
    Lookup {
        contact: String,
        source: PlatformError,
    },
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContacts => write!(f, "no contacts to invite"),
            Self::BlankContact { position } => {
                write!(f, "contact #{} is blank", position + 1)
            }
            Self::DuplicateContact { contact } => {
                write!(f, "contact '{contact}' is listed more than once")
            }
            Self::DuplicateParticipant { contact, person_id } => {
                write!(f, "'{contact}' resolves to {person_id}, who is already invited")
            }
            Self::NotFound { contact } => {
                write!(f, "no directory entry for '{contact}'")
            }
            Self::Ambiguous { contact, matches } => {
                write!(f, "'{contact}' matches {matches} directory entries")
            }
            Self::Lookup { contact, source } => {
                write!(f, "directory lookup for '{contact}' failed: {source}")
            }
        }
    }
}

impl std::error::Error for ResolutionError {}

/// Fatal errors that abort a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No access token could be obtained.
    Identity(IdentityError),
    /// A contact did not resolve to exactly one person.
    Resolution(ResolutionError),
    /// The space could not be created.
    SpaceCreate(PlatformError),
    /// The space's call address could not be looked up.
    SpaceLookup { space_id: SpaceId, reason: String },
    /// A participant could not be added to the space.
    Membership {
        person_id: PersonId,
        source: PlatformError,
    },
    /// A join watch could not be registered.
    WatchRegistration {
        person_id: PersonId,
        source: PlatformError,
    },
    /// The call could not be placed.
    Call(TelephonyError),
    /// The relay could not be provisioned or read.
    Relay(RelayError),
    /// The orchestrator attempted an out-of-order transition.
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

impl SessionError {
    /// Short machine-readable name of the error class.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identity(_) => "identity",
            Self::Resolution(_) => "resolution",
            Self::SpaceCreate(_) => "space_create",
            Self::SpaceLookup { .. } => "space_lookup",
            Self::Membership { .. } => "membership",
            Self::WatchRegistration { .. } => "watch_registration",
            Self::Call(_) => "call",
            Self::Relay(_) => "relay",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(e) => write!(f, "identity provider failed: {e}"),
            Self::Resolution(e) => write!(f, "participant resolution failed: {e}"),
            Self::SpaceCreate(e) => write!(f, "space creation failed: {e}"),
            Self::SpaceLookup { space_id, reason } => {
                write!(f, "space {space_id} lookup failed: {reason}")
            }
            Self::Membership { person_id, source } => {
                write!(f, "adding {person_id} to the space failed: {source}")
            }
            Self::WatchRegistration { person_id, source } => {
                write!(f, "registering join watch for {person_id} failed: {source}")
            }
            Self::Call(e) => write!(f, "call placement failed: {e}"),
            Self::Relay(e) => write!(f, "notification relay failed: {e}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid session transition {from} -> {to}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ResolutionError> for SessionError {
    fn from(e: ResolutionError) -> Self {
        Self::Resolution(e)
    }
}

/// Non-fatal failures recorded in the session report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionWarning {
    /// The welcome announcement could not be posted.
    WelcomeFailed(PlatformError),
    /// A reminder could not be delivered.
    ReminderFailed {
        person_id: PersonId,
        source: PlatformError,
    },
    /// The final join refresh before cleanup could not read the relay.
    FinalCheckFailed(RelayError),
    /// The call leg could not be ended.
    CallNotEnded {
        call_leg: CallLegId,
        source: TelephonyError,
    },
    /// The space could not be removed.
    SpaceNotRemoved {
        space_id: SpaceId,
        source: PlatformError,
    },
    /// A watch registration could not be removed.
    WatchNotRemoved {
        watch_id: WatchId,
        source: PlatformError,
    },
}

impl SessionWarning {
    /// Returns true for failures that leave a remote resource behind.
    #[must_use]
    pub fn is_cleanup(&self) -> bool {
        matches!(
            self,
            Self::CallNotEnded { .. } | Self::SpaceNotRemoved { .. } | Self::WatchNotRemoved { .. }
        )
    }
}

impl fmt::Display for SessionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WelcomeFailed(e) => write!(f, "welcome message not posted: {e}"),
            Self::ReminderFailed { person_id, source } => {
                write!(f, "reminder to {person_id} not delivered: {source}")
            }
            Self::FinalCheckFailed(e) => write!(f, "final join check skipped: {e}"),
            Self::CallNotEnded { call_leg, source } => {
                write!(f, "call leg {call_leg} left running: {source}")
            }
            Self::SpaceNotRemoved { space_id, source } => {
                write!(f, "space {space_id} left behind: {source}")
            }
            Self::WatchNotRemoved { watch_id, source } => {
                write!(f, "watch {watch_id} left registered: {source}")
            }
        }
    }
}
