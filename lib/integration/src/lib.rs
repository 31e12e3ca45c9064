//! Remote collaborators of the huddle dispatcher.
//!
//! This crate provides:
//!
//! - **Identity provider**: guest-issuer token minting and access token exchange
//! - **Platform**: directory, space, messaging and webhook operations
//! - **Notification relay**: disposable webhook inbox that is polled for deliveries
//! - **Telephony**: outbound SIP calls bridging into a space
//!
//! Each collaborator is a trait so the session orchestrator can be exercised
//! against in-memory fakes; the REST implementations live alongside.

pub mod error;
pub mod http;
pub mod identity;
pub mod platform;
pub mod relay;
pub mod telephony;
pub mod webex;

pub use error::{IdentityError, PlatformError, RelayError, TelephonyError};
pub use http::HttpConfig;
pub use identity::{AccessToken, GuestIssuer, GuestIssuerConfig, IdentityProvider};
pub use platform::{Membership, MessageTarget, Person, Platform, Space, Webhook, WebhookSpec};
pub use relay::{JoinEvent, NotificationRelay, RelayConfig, RelayItem, WebhookInbox};
pub use telephony::{CallRequest, Telephony, TelephonyConfig, TwilioTelephony};
pub use webex::{PlatformConfig, WebexPlatform};
