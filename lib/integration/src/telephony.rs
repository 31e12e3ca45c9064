//! Telephony provider: outbound SIP calls into a space.

use crate::error::TelephonyError;
use crate::http::{HttpConfig, error_message, join_url};
use async_trait::async_trait;
use huddle_core::CallLegId;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, instrument};

/// An outbound call request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Dial target, e.g. `sip:123@meet.example.com;transport=tls`.
    pub to: String,
    /// URL of the call-flow document played on answer.
    pub call_flow_url: String,
    /// Caller id presented to the callee.
    pub from: String,
}

/// Operations consumed from the telephony provider.
#[async_trait]
pub trait Telephony: Send + Sync {
    /// Places a call and returns its leg identifier.
    async fn place_call(&self, request: &CallRequest) -> Result<CallLegId, TelephonyError>;

    /// Marks a call leg as completed, hanging it up.
    async fn complete_call(&self, leg: &CallLegId) -> Result<(), TelephonyError>;
}

/// Telephony account settings.
#[derive(Clone, Deserialize)]
pub struct TelephonyConfig {
    /// Account identifier.
    pub account_sid: String,
    /// Account secret.
    pub auth_token: String,
    /// Call-flow document fetched by the provider when the call connects.
    pub call_flow_url: String,
    /// Caller id presented on the call.
    #[serde(default = "default_caller_id")]
    pub caller_id: String,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_caller_id() -> String {
    "HuddleDispatcher".to_string()
}

fn default_api_base() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

impl fmt::Debug for TelephonyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephonyConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[redacted]")
            .field("call_flow_url", &self.call_flow_url)
            .field("caller_id", &self.caller_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: CallLegId,
}

/// Twilio REST client.
#[derive(Clone)]
pub struct TwilioTelephony {
    config: TelephonyConfig,
    client: reqwest::Client,
}

impl TwilioTelephony {
    /// Creates a telephony client.
    #[must_use]
    pub fn new(config: TelephonyConfig, http: &HttpConfig) -> Self {
        Self {
            config,
            client: http.build_client(),
        }
    }

    fn calls_url(&self, suffix: &str) -> String {
        join_url(
            &self.config.api_base,
            &format!("Accounts/{}/Calls{suffix}", self.config.account_sid),
        )
    }

    async fn submit(
        &self,
        operation: &'static str,
        url: String,
        form: &[(&str, &str)],
    ) -> Result<CallResource, TelephonyError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| TelephonyError::Transport {
                operation,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(TelephonyError::Rejected {
                operation,
                status,
                message: error_message(response).await,
            });
        }

        response
            .json::<CallResource>()
            .await
            .map_err(|e| TelephonyError::Decode {
                operation,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Telephony for TwilioTelephony {
    #[instrument(skip(self), fields(to = %request.to))]
    async fn place_call(&self, request: &CallRequest) -> Result<CallLegId, TelephonyError> {
        let call = self
            .submit(
                "place_call",
                self.calls_url(".json"),
                &[
                    ("Url", request.call_flow_url.as_str()),
                    ("To", request.to.as_str()),
                    ("From", request.from.as_str()),
                ],
            )
            .await?;
        debug!(call_leg = %call.sid, "call placed");
        Ok(call.sid)
    }

    #[instrument(skip(self), fields(call_leg = %leg))]
    async fn complete_call(&self, leg: &CallLegId) -> Result<(), TelephonyError> {
        self.submit(
            "complete_call",
            self.calls_url(&format!("/{leg}.json")),
            &[("Status", "completed")],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, Path};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn spawn_provider() -> String {
        let app = Router::new()
            .route(
                "/2010-04-01/Accounts/AC1/Calls.json",
                post(
                    |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| async move {
                        if headers.get("authorization").is_none() {
                            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "auth"})));
                        }
                        let to = form.get("To").cloned().unwrap_or_default();
                        if to.ends_with(";transport=tls") && form.contains_key("Url") {
                            (StatusCode::CREATED, Json(json!({ "sid": "CA1", "status": "queued" })))
                        } else {
                            (StatusCode::BAD_REQUEST, Json(json!({ "message": "bad To" })))
                        }
                    },
                ),
            )
            .route(
                "/2010-04-01/Accounts/AC1/Calls/{sid}",
                post(
                    |Path(sid): Path<String>, Form(form): Form<HashMap<String, String>>| async move {
                        let leg = sid.trim_end_matches(".json").to_string();
                        if form.get("Status").map(String::as_str) == Some("completed") {
                            (StatusCode::OK, Json(json!({ "sid": leg, "status": "completed" })))
                        } else {
                            (StatusCode::BAD_REQUEST, Json(json!({ "message": "bad status" })))
                        }
                    },
                ),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}/2010-04-01")
    }

    fn config(api_base: String) -> TelephonyConfig {
        TelephonyConfig {
            account_sid: "AC1".to_string(),
            auth_token: "secret".to_string(),
            call_flow_url: "https://handler.example.com/flow".to_string(),
            caller_id: default_caller_id(),
            api_base,
        }
    }

    #[tokio::test]
    async fn place_and_complete_call() {
        let telephony = TwilioTelephony::new(config(spawn_provider().await), &HttpConfig::default());

        let leg = telephony
            .place_call(&CallRequest {
                to: "sip:555@meet.example.com;transport=tls".to_string(),
                call_flow_url: "https://handler.example.com/flow".to_string(),
                from: "HuddleDispatcher".to_string(),
            })
            .await
            .expect("place");
        assert_eq!(leg, CallLegId::new("CA1"));

        telephony.complete_call(&leg).await.expect("complete");
    }

    #[tokio::test]
    async fn rejected_call_reports_status() {
        let telephony = TwilioTelephony::new(config(spawn_provider().await), &HttpConfig::default());

        let err = telephony
            .place_call(&CallRequest {
                to: "sip:555@meet.example.com".to_string(),
                call_flow_url: "https://handler.example.com/flow".to_string(),
                from: "HuddleDispatcher".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TelephonyError::Rejected {
                operation: "place_call",
                status: 400,
                message: "bad To".to_string(),
            }
        );
    }

    #[test]
    fn debug_output_redacts_auth_token() {
        let rendered = format!("{:?}", config("http://x".to_string()));
        assert!(!rendered.contains("secret"));
    }
}
