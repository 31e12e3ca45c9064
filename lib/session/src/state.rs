//! Session state machine.
//!
//! A session moves through its stages in strict order and never revisits a
//! state. Each state names the last stage that completed; the only branch is
//! into `Aborted`, from any non-terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The stage a session has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Nothing has happened yet.
    Init,
    /// An access token is installed on the platform client.
    IdentityReady,
    /// A relay inbox exists to receive join webhooks.
    InboxReady,
    /// Every contact resolved to exactly one participant.
    ParticipantsResolved,
    /// The space exists.
    SpaceCreated,
    /// The space's dialable address is known.
    SpaceAddressKnown,
    /// Every participant is a member of the space.
    MembersAdded,
    /// Every participant has a join watch.
    WatchesRegistered,
    /// The welcome announcement was attempted.
    WelcomeSent,
    /// The call leg into the space is up.
    CallPlaced,
    /// The first wait elapsed.
    #[serde(rename = "WAIT_1")]
    Wait1,
    /// Delivered join events were reconciled against the roster.
    JoinCheck,
    /// Reminders were attempted for everyone who had not joined.
    RemindersSent,
    /// The second wait elapsed.
    #[serde(rename = "WAIT_2")]
    Wait2,
    /// Call ended, space removed, watches removed.
    CleanedUp,
    /// A fatal error stopped the pipeline.
    Aborted,
}

impl SessionState {
    /// The stages in pipeline order, excluding `Aborted`.
    pub const PIPELINE: [SessionState; 15] = [
        Self::Init,
        Self::IdentityReady,
        Self::InboxReady,
        Self::ParticipantsResolved,
        Self::SpaceCreated,
        Self::SpaceAddressKnown,
        Self::MembersAdded,
        Self::WatchesRegistered,
        Self::WelcomeSent,
        Self::CallPlaced,
        Self::Wait1,
        Self::JoinCheck,
        Self::RemindersSent,
        Self::Wait2,
        Self::CleanedUp,
    ];

    /// Returns the state that follows on success, if any.
    #[must_use]
    pub fn next(self) -> Option<SessionState> {
        let position = Self::PIPELINE.iter().position(|s| *s == self)?;
        Self::PIPELINE.get(position + 1).copied()
    }

    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CleanedUp | Self::Aborted)
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::IdentityReady => "IDENTITY_READY",
            Self::InboxReady => "INBOX_READY",
            Self::ParticipantsResolved => "PARTICIPANTS_RESOLVED",
            Self::SpaceCreated => "SPACE_CREATED",
            Self::SpaceAddressKnown => "SPACE_ADDRESS_KNOWN",
            Self::MembersAdded => "MEMBERS_ADDED",
            Self::WatchesRegistered => "WATCHES_REGISTERED",
            Self::WelcomeSent => "WELCOME_SENT",
            Self::CallPlaced => "CALL_PLACED",
            Self::Wait1 => "WAIT_1",
            Self::JoinCheck => "JOIN_CHECK",
            Self::RemindersSent => "REMINDERS_SENT",
            Self::Wait2 => "WAIT_2",
            Self::CleanedUp => "CLEANED_UP",
            Self::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
