//! Huddle session orchestration.
//!
//! This crate provides:
//!
//! - **Session state machine**: the strictly ordered stages of a huddle
//! - **Directory resolver**: contacts to exactly one participant each
//! - **Space manager**: the space, its members and its messages
//! - **Join-event watcher**: webhooks, relay polling and join reconciliation
//! - **Call dispatcher**: the SIP call bridging into the space
//! - **Orchestrator**: drives a session through every stage and always
//!   releases what it created

pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod session;
pub mod space;
pub mod state;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SessionSettings;
pub use directory::DirectoryResolver;
pub use dispatcher::{CallDispatcher, CallProfile, sip_target};
pub use error::{ResolutionError, SessionError, SessionWarning};
pub use orchestrator::{Collaborators, SessionOrchestrator};
pub use report::SessionReport;
pub use session::Session;
pub use space::SpaceManager;
pub use state::SessionState;
pub use watcher::{JoinEventWatcher, PartialRegistration, WatchTeardown, reconcile};
