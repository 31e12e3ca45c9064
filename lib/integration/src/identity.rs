//! Identity provider: guest-issuer tokens exchanged for platform access.
//!
//! The dispatcher authenticates as a guest issued by a registered guest
//! issuer application. A short-lived HS256 token is signed locally with the
//! issuer's shared secret and exchanged once, at session start, for an access
//! token that authorizes every subsequent platform call.

use crate::error::IdentityError;
use crate::http::{HttpConfig, error_message, join_url};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

/// Lifetime of a minted guest token.
const GUEST_TOKEN_TTL_HOURS: i64 = 24;

/// A bearer token authorizing platform calls.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token, optionally with a known expiry.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Returns the raw bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Returns when the token expires, if the provider said.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of platform access tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Obtains a fresh access token for the dispatching service.
    async fn authorize(&self) -> Result<AccessToken, IdentityError>;
}

/// Configuration of the guest issuer application.
#[derive(Clone, Deserialize)]
pub struct GuestIssuerConfig {
    /// The guest issuer id, used as the `iss` claim.
    pub issuer_id: String,
    /// The base64-encoded shared secret of the guest issuer.
    pub shared_secret: String,
    /// Subject and display name the dispatcher appears as.
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_subject() -> String {
    "Huddle Dispatcher".to_string()
}

impl fmt::Debug for GuestIssuerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestIssuerConfig")
            .field("issuer_id", &self.issuer_id)
            .field("shared_secret", &"[redacted]")
            .field("subject", &self.subject)
            .finish()
    }
}

/// Claims carried by a guest token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestClaims {
    pub sub: String,
    pub name: String,
    pub iss: String,
    pub exp: i64,
}

/// Mints a signed guest token valid for 24 hours from `now`.
///
/// # Errors
///
/// Returns an error if the shared secret is not base64 or signing fails.
pub fn mint_guest_token(
    config: &GuestIssuerConfig,
    now: DateTime<Utc>,
) -> Result<String, IdentityError> {
    let secret = STANDARD
        .decode(config.shared_secret.trim())
        .map_err(|e| IdentityError::InvalidSecret {
            reason: e.to_string(),
        })?;

    let claims = GuestClaims {
        sub: config.subject.clone(),
        name: config.subject.clone(),
        iss: config.issuer_id.clone(),
        exp: (now + Duration::hours(GUEST_TOKEN_TTL_HOURS)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&secret),
    )
    .map_err(|e| IdentityError::SigningFailed {
        reason: e.to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenExchangeResponse {
    token: String,
    expires_in: Option<i64>,
}

/// Identity provider that exchanges guest tokens at the platform's login endpoint.
#[derive(Clone)]
pub struct GuestIssuer {
    config: GuestIssuerConfig,
    api_base: String,
    client: reqwest::Client,
}

impl GuestIssuer {
    /// Creates a guest issuer exchanging tokens against `api_base`.
    #[must_use]
    pub fn new(config: GuestIssuerConfig, api_base: impl Into<String>, http: &HttpConfig) -> Self {
        Self {
            config,
            api_base: api_base.into(),
            client: http.build_client(),
        }
    }
}

/// Converts a provider-reported lifetime into an expiry instant.
///
/// Lifetimes that cannot be represented are dropped, leaving the expiry unknown.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    let expiry = Duration::try_seconds(expires_in).and_then(|ttl| now.checked_add_signed(ttl));
    if expiry.is_none() {
        warn!(expires_in, "ignoring out-of-range token lifetime");
    }
    expiry
}

#[async_trait]
impl IdentityProvider for GuestIssuer {
    #[instrument(skip(self), fields(issuer = %self.config.issuer_id))]
    async fn authorize(&self) -> Result<AccessToken, IdentityError> {
        let now = Utc::now();
        let guest_token = mint_guest_token(&self.config, now)?;

        let response = self
            .client
            .post(join_url(&self.api_base, "jwt/login"))
            .bearer_auth(guest_token)
            .send()
            .await
            .map_err(|e| IdentityError::Transport {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(IdentityError::Rejected {
                status,
                message: error_message(response).await,
            });
        }

        let body: TokenExchangeResponse =
            response.json().await.map_err(|e| IdentityError::Decode {
                reason: e.to_string(),
            })?;

        let expires_at = body.expires_in.and_then(|secs| token_expiry(now, secs));
        debug!(?expires_at, "access token issued");
        Ok(AccessToken::new(body.token, expires_at))
    }
}
