//! Session orchestrator for driving one huddle end to end.
//!
//! The orchestrator runs the pipeline:
//! 1. Authorize against the identity provider and install the token
//! 2. Provision a relay inbox for join webhooks
//! 3. Resolve contacts to participants
//! 4. Create the space, look up its call address and add everyone
//! 5. Register join watches, post the welcome and place the call
//! 6. Wait, check who joined and remind the rest
//! 7. Wait again, then end the call, remove the space and the watches
//!
//! The first fatal error aborts the pipeline. Cleanup runs on every path and
//! releases whatever remote resources the session recorded.

use crate::config::SessionSettings;
use crate::directory::DirectoryResolver;
use crate::dispatcher::{CallDispatcher, CallProfile};
use crate::error::{SessionError, SessionWarning};
use crate::report::SessionReport;
use crate::session::Session;
use crate::space::SpaceManager;
use crate::state::SessionState;
use crate::watcher::JoinEventWatcher;
use futures::future::join_all;
use huddle_core::{PersonId, WatchId};
use huddle_integration::{IdentityProvider, NotificationRelay, Platform, Telephony};
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};

/// The remote collaborators a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub platform: Arc<dyn Platform>,
    pub relay: Arc<dyn NotificationRelay>,
    pub telephony: Arc<dyn Telephony>,
}

/// Best-effort outcomes collected while the pipeline runs.
#[derive(Debug, Default)]
struct RunLog {
    reminded: Vec<PersonId>,
    warnings: Vec<SessionWarning>,
}

/// Drives huddle sessions.
pub struct SessionOrchestrator {
    identity: Arc<dyn IdentityProvider>,
    platform: Arc<dyn Platform>,
    directory: DirectoryResolver,
    spaces: SpaceManager,
    watcher: JoinEventWatcher,
    dispatcher: CallDispatcher,
    settings: SessionSettings,
}

impl SessionOrchestrator {
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        profile: CallProfile,
        settings: SessionSettings,
    ) -> Self {
        let Collaborators {
            identity,
            platform,
            relay,
            telephony,
        } = collaborators;
        Self {
            directory: DirectoryResolver::new(platform.clone()),
            spaces: SpaceManager::new(platform.clone()),
            watcher: JoinEventWatcher::new(platform.clone(), relay),
            dispatcher: CallDispatcher::new(telephony, profile),
            identity,
            platform,
            settings,
        }
    }

    /// Runs a new session built from the configured title and contacts.
    pub async fn run(&self) -> SessionReport {
        let session = Session::new(self.settings.title.clone(), self.settings.contacts());
        self.run_session(session).await
    }

    /// Runs `session` to a terminal state and reports the outcome.
    ///
    /// Never returns early: a fatal error moves the session to `Aborted` and
    /// cleanup still runs.
    pub async fn run_session(&self, mut session: Session) -> SessionReport {
        let span = info_span!(
            "huddle_session",
            session_id = %session.id(),
            title = %session.title(),
        );

        async move {
            info!(contacts = session.contacts().len(), "session starting");
            let mut log = RunLog::default();

            let mut outcome = self.drive(&mut session, &mut log).await;
            if let Err(e) = &outcome {
                session.abort();
                error!(
                    stage = ?session.failed_stage(),
                    kind = e.kind(),
                    error = %e,
                    "session aborted, releasing resources"
                );
            }

            log.warnings.extend(self.cleanup(&mut session).await);

            if outcome.is_ok() {
                outcome = session.advance(SessionState::CleanedUp);
                if outcome.is_err() {
                    session.abort();
                }
            }

            let report = SessionReport::new(&session, outcome.err(), log.reminded, log.warnings);
            info!(
                state = %report.final_state,
                never_joined = report.never_joined.len(),
                reminded = report.reminded.len(),
                warnings = report.warnings.len(),
                "session finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, session: &mut Session, log: &mut RunLog) -> Result<(), SessionError> {
        if session.state() != SessionState::Init {
            return Err(SessionError::InvalidTransition {
                from: session.state(),
                to: SessionState::IdentityReady,
            });
        }

        let token = self
            .identity
            .authorize()
            .await
            .map_err(SessionError::Identity)?;
        self.platform.use_token(token).await;
        session.advance(SessionState::IdentityReady)?;

        let relay_base_url = self.watcher.provision_inbox().await?;
        session.set_relay_base_url(relay_base_url.clone());
        session.advance(SessionState::InboxReady)?;

        let invited = self.directory.resolve(session.contacts()).await?;
        session.set_invited(invited.clone());
        session.advance(SessionState::ParticipantsResolved)?;

        let space_id = self.spaces.create_space(session.title()).await?;
        session.set_space(space_id.clone());
        session.advance(SessionState::SpaceCreated)?;

        let call_address = self
            .spaces
            .space_address(
                &space_id,
                self.settings.lookup_retries,
                self.settings.lookup_retry_delay(),
            )
            .await?;
        session.set_call_address(call_address.clone());
        session.advance(SessionState::SpaceAddressKnown)?;

        self.spaces.add_members(&space_id, &invited).await?;
        session.advance(SessionState::MembersAdded)?;

        match self.watcher.register_watches(&invited, &relay_base_url).await {
            Ok(watches) => session.add_watches(watches),
            Err(partial) => {
                session.add_watches(partial.registered);
                return Err(partial.error);
            }
        }
        session.advance(SessionState::WatchesRegistered)?;

        let welcome = self.settings.welcome_message();
        if let Err(e) = self.spaces.post_message(&space_id, &welcome).await {
            warn!(error = %e, "welcome message not posted");
            log.warnings.push(SessionWarning::WelcomeFailed(e));
        }
        session.advance(SessionState::WelcomeSent)?;

        let call_leg = self.dispatcher.place_call(&call_address).await?;
        session.set_call_leg(call_leg);
        session.advance(SessionState::CallPlaced)?;

        info!(wait = ?self.settings.join_wait(), "waiting for participants to join");
        tokio::time::sleep(self.settings.join_wait()).await;
        session.advance(SessionState::Wait1)?;

        let joined = self
            .watcher
            .poll_delivered_events(&relay_base_url)
            .await
            .map_err(SessionError::Relay)?;
        session.record_joiners(joined);
        info!(
            joined = session.observed().len(),
            remaining = session.remaining().len(),
            "join check complete"
        );
        session.advance(SessionState::JoinCheck)?;

        let reminded = self.send_reminders(session.remaining(), log).await;
        log.reminded = reminded;
        session.advance(SessionState::RemindersSent)?;

        info!(wait = ?self.settings.reminder_wait(), "waiting after reminders");
        tokio::time::sleep(self.settings.reminder_wait()).await;

        match self.watcher.poll_delivered_events(&relay_base_url).await {
            Ok(joined) => session.record_joiners(joined),
            Err(e) => {
                warn!(error = %e, "final join check failed, keeping earlier result");
                log.warnings.push(SessionWarning::FinalCheckFailed(e));
            }
        }
        session.advance(SessionState::Wait2)?;

        Ok(())
    }

    /// Sends the reminder to everyone in `remind` and returns who received it.
    async fn send_reminders(&self, remind: &[PersonId], log: &mut RunLog) -> Vec<PersonId> {
        if remind.is_empty() {
            info!("everyone joined, no reminders needed");
            return Vec::new();
        }

        let text = self.settings.reminder_message();
        let results = join_all(remind.iter().map(|person_id| {
            let text = text.as_str();
            async move { (person_id, self.spaces.direct_message(person_id, text).await) }
        }))
        .await;

        let mut reminded = Vec::with_capacity(results.len());
        for (person_id, result) in results {
            match result {
                Ok(_) => reminded.push(person_id.clone()),
                Err(source) => {
                    warn!(%person_id, error = %source, "reminder not delivered");
                    log.warnings.push(SessionWarning::ReminderFailed {
                        person_id: person_id.clone(),
                        source,
                    });
                }
            }
        }
        info!(reminded = reminded.len(), "reminders sent");
        reminded
    }

    /// Releases every remote resource the session still records.
    ///
    /// Ends the call, removes the space, then removes the watches. Each step
    /// is attempted even if an earlier one failed. Resources released here are
    /// cleared from the session, so calling this again only retries what is
    /// left.
    pub async fn cleanup(&self, session: &mut Session) -> Vec<SessionWarning> {
        let mut warnings = Vec::new();

        if let Some(call_leg) = session.active_call_leg().cloned() {
            match self.dispatcher.end_call(&call_leg).await {
                Ok(()) => session.mark_call_ended(),
                Err(source) => {
                    warn!(%call_leg, error = %source, "call leg not ended");
                    warnings.push(SessionWarning::CallNotEnded { call_leg, source });
                }
            }
        }

        if let Some(space_id) = session.space_id().cloned() {
            match self.spaces.remove_space(&space_id).await {
                Ok(()) => session.clear_space(),
                Err(source) => {
                    warn!(%space_id, error = %source, "space not removed");
                    warnings.push(SessionWarning::SpaceNotRemoved { space_id, source });
                }
            }
        }

        if !session.watches().is_empty() {
            let teardown = self.watcher.teardown_watches(session.watches()).await;
            let still_registered: Vec<WatchId> =
                teardown.failed.iter().map(|(id, _)| id.clone()).collect();
            session.retain_watches(&still_registered);
            warnings.extend(
                teardown
                    .failed
                    .into_iter()
                    .map(|(watch_id, source)| SessionWarning::WatchNotRemoved { watch_id, source }),
            );
        }

        if session.is_released() {
            info!("session resources released");
        } else {
            warn!(
                space = ?session.space_id(),
                call_leg = ?session.active_call_leg(),
                watches = session.watches().len(),
                "session resources left behind"
            );
        }
        warnings
    }
}
