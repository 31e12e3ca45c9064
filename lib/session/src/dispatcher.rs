//! Call dispatcher: the outbound call that bridges into the space.

use crate::error::SessionError;
use huddle_core::CallLegId;
use huddle_integration::{CallRequest, Telephony, TelephonyError};
use std::sync::Arc;
use tracing::{info, instrument};

/// What the dispatcher plays and presents on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallProfile {
    /// Call-flow document fetched by the provider once the call connects.
    pub call_flow_url: String,
    /// Caller id presented to the space.
    pub caller_id: String,
}

/// Formats a space's SIP address as a TLS dial target.
#[must_use]
pub fn sip_target(call_address: &str) -> String {
    let address = call_address.trim();
    let address = address.strip_prefix("sip:").unwrap_or(address);
    format!("sip:{address};transport=tls")
}

/// Places and ends the call leg into a space.
#[derive(Clone)]
pub struct CallDispatcher {
    telephony: Arc<dyn Telephony>,
    profile: CallProfile,
}

impl CallDispatcher {
    #[must_use]
    pub fn new(telephony: Arc<dyn Telephony>, profile: CallProfile) -> Self {
        Self { telephony, profile }
    }

    /// Calls into the space over TLS-secured SIP.
    ///
    /// # Errors
    ///
    /// Returns `Call` if the provider rejects the call; there is no retry.
    #[instrument(skip(self))]
    pub async fn place_call(&self, call_address: &str) -> Result<CallLegId, SessionError> {
        let request = CallRequest {
            to: sip_target(call_address),
            call_flow_url: self.profile.call_flow_url.clone(),
            from: self.profile.caller_id.clone(),
        };
        let leg = self
            .telephony
            .place_call(&request)
            .await
            .map_err(SessionError::Call)?;
        info!(call_leg = %leg, "call placed into space");
        Ok(leg)
    }

    /// Marks the call leg completed.
    ///
    /// # Errors
    ///
    /// Returns the provider error; there is no retry.
    #[instrument(skip(self), fields(call_leg = %leg))]
    pub async fn end_call(&self, leg: &CallLegId) -> Result<(), TelephonyError> {
        self.telephony.complete_call(leg).await?;
        info!("call ended");
        Ok(())
    }
}
