//! Centralized dispatcher configuration.
//!
//! This module provides strongly-typed configuration for the dispatcher,
//! loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `TELEPHONY__ACCOUNT_SID`. Values stay strings
//! until deserialization so caller ids such as `+15550100` keep their sign.

use huddle_integration::{GuestIssuerConfig, HttpConfig, PlatformConfig, RelayConfig, TelephonyConfig};
use huddle_session::{CallProfile, SessionSettings};
use serde::Deserialize;

/// Dispatcher configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct DispatcherConfig {
    /// Guest issuer credentials for the platform.
    pub identity: GuestIssuerConfig,

    /// Collaboration platform endpoint.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Notification relay endpoint.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Telephony provider account and call flow.
    pub telephony: TelephonyConfig,

    /// The session to run.
    pub session: SessionSettings,

    /// Shared HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl DispatcherConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__"))
            .build()?
            .try_deserialize()
    }

    /// What every call presents to the space.
    #[must_use]
    pub fn call_profile(&self) -> CallProfile {
        CallProfile {
            call_flow_url: self.telephony.call_flow_url.clone(),
            caller_id: self.telephony.caller_id.clone(),
        }
    }
}
