//! Outcome of one session run.

use crate::error::{SessionError, SessionWarning};
use crate::session::Session;
use crate::state::SessionState;
use huddle_core::{CallLegId, PersonId, SessionId, SpaceId, WatchId};
use std::fmt;

/// What a session did, what it failed at and what it left behind.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub title: String,
    /// `CleanedUp` for a completed run, `Aborted` otherwise.
    pub final_state: SessionState,
    /// The stage that was running when the session aborted.
    pub failed_stage: Option<SessionState>,
    /// The fatal error, if any.
    pub error: Option<SessionError>,
    /// Participants in invitation order.
    pub invited: Vec<PersonId>,
    /// Participants never observed joining, in invitation order.
    pub never_joined: Vec<PersonId>,
    /// Participants a reminder was delivered to.
    pub reminded: Vec<PersonId>,
    /// The call leg, if one was placed.
    pub call_leg: Option<CallLegId>,
    /// Remote resources still present after cleanup.
    pub leaked_space: Option<SpaceId>,
    pub leaked_call: Option<CallLegId>,
    pub leaked_watches: Vec<WatchId>,
    pub warnings: Vec<SessionWarning>,
}

impl SessionReport {
    pub(crate) fn new(
        session: &Session,
        error: Option<SessionError>,
        reminded: Vec<PersonId>,
        warnings: Vec<SessionWarning>,
    ) -> Self {
        Self {
            session_id: session.id(),
            title: session.title().to_string(),
            final_state: session.state(),
            failed_stage: session.failed_stage(),
            error,
            invited: session.invited().to_vec(),
            never_joined: session.remaining().to_vec(),
            reminded,
            call_leg: session.call_leg().cloned(),
            leaked_space: session.space_id().cloned(),
            leaked_call: session.active_call_leg().cloned(),
            leaked_watches: session.watches().to_vec(),
            warnings,
        }
    }

    /// Returns true if the session ran to completion.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.final_state == SessionState::CleanedUp
    }

    /// Returns true if cleanup released every remote resource.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.leaked_space.is_none() && self.leaked_call.is_none() && self.leaked_watches.is_empty()
    }

    /// Converts the fatal error, if any, into a report-carrying result.
    ///
    /// # Errors
    ///
    /// Returns the session error when the run aborted.
    pub fn outcome(&self) -> huddle_core::Result<(), SessionError> {
        match &self.error {
            None => Ok(()),
            Some(error) => Err(error.clone().into()),
        }
    }
}

fn join_ids<T: fmt::Display>(ids: &[T]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "session {} ({})", self.session_id, self.title)?;
        writeln!(f, "  final state:  {}", self.final_state)?;
        if let Some(stage) = self.failed_stage {
            writeln!(f, "  failed stage: {stage}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "  error:        {error}")?;
        }
        writeln!(f, "  invited:      {}", join_ids(&self.invited))?;
        writeln!(f, "  never joined: {}", join_ids(&self.never_joined))?;
        writeln!(f, "  reminded:     {}", join_ids(&self.reminded))?;
        for warning in &self.warnings {
            writeln!(f, "  warning:      {warning}")?;
        }
        write!(
            f,
            "  released:     {}",
            if self.is_released() { "yes" } else { "no" }
        )
    }
}
