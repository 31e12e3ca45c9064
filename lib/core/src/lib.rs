//! Core types shared across the huddle dispatcher.
//!
//! This crate provides the `Result` alias used at the top of the error stack
//! and the strongly-typed identifiers that flow between the integration
//! clients and the session orchestrator.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{
    CallLegId, MembershipId, MessageId, ParseIdError, PersonId, SessionId, SpaceId, WatchId,
};
