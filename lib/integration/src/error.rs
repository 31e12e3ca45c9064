//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `IdentityError`: Guest token minting and access token exchange
//! - `PlatformError`: Directory, space, messaging and webhook calls
//! - `RelayError`: Notification relay inbox calls
//! - `TelephonyError`: Call placement and termination
//!
//! The session layer wraps these in its own taxonomy, naming the stage that
//! failed.

use std::fmt;

/// Errors from minting or exchanging identity credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The shared secret is not valid base64.
    InvalidSecret { reason: String },
    /// Signing the guest token failed.
    SigningFailed { reason: String },
    /// The token exchange request could not be sent.
    Transport { reason: String },
    /// The identity provider rejected the guest token.
    Rejected { status: u16, message: String },
    /// The token exchange response could not be decoded.
    Decode { reason: String },
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSecret { reason } => {
                write!(f, "guest issuer secret is not valid base64: {reason}")
            }
            Self::SigningFailed { reason } => {
                write!(f, "failed to sign guest token: {reason}")
            }
            Self::Transport { reason } => {
                write!(f, "token exchange request failed: {reason}")
            }
            Self::Rejected { status, message } => {
                write!(f, "token exchange rejected ({status}): {message}")
            }
            Self::Decode { reason } => {
                write!(f, "invalid token exchange response: {reason}")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

/// Errors from collaboration platform operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// No access token has been installed on the client.
    Unauthorized { operation: &'static str },
    /// The request could not be sent or the connection failed.
    Transport {
        operation: &'static str,
        reason: String,
    },
    /// The platform answered with a non-success status.
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },
    /// The response body did not match the expected shape.
    Decode {
        operation: &'static str,
        reason: String,
    },
}

impl PlatformError {
    /// Returns the HTTP status for rejections.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { operation } => {
                write!(f, "'{operation}' called before an access token was installed")
            }
            Self::Transport { operation, reason } => {
                write!(f, "'{operation}' request failed: {reason}")
            }
            Self::Rejected {
                operation,
                status,
                message,
            } => {
                write!(f, "'{operation}' rejected ({status}): {message}")
            }
            Self::Decode { operation, reason } => {
                write!(f, "'{operation}' returned an invalid response: {reason}")
            }
        }
    }
}

impl std::error::Error for PlatformError {}

/// Errors from the notification relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The request could not be sent or the connection failed.
    Transport { reason: String },
    /// The relay answered with a non-success status.
    Rejected { status: u16, message: String },
    /// The response body did not match the expected shape.
    Decode { reason: String },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { reason } => write!(f, "relay request failed: {reason}"),
            Self::Rejected { status, message } => {
                write!(f, "relay rejected request ({status}): {message}")
            }
            Self::Decode { reason } => write!(f, "invalid relay response: {reason}"),
        }
    }
}

impl std::error::Error for RelayError {}

/// Errors from the telephony provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyError {
    /// The request could not be sent or the connection failed.
    Transport {
        operation: &'static str,
        reason: String,
    },
    /// The provider answered with a non-success status.
    Rejected {
        operation: &'static str,
        status: u16,
        message: String,
    },
    /// The response body did not match the expected shape.
    Decode {
        operation: &'static str,
        reason: String,
    },
}

impl fmt::Display for TelephonyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { operation, reason } => {
                write!(f, "telephony '{operation}' request failed: {reason}")
            }
            Self::Rejected {
                operation,
                status,
                message,
            } => {
                write!(f, "telephony '{operation}' rejected ({status}): {message}")
            }
            Self::Decode { operation, reason } => {
                write!(f, "telephony '{operation}' returned an invalid response: {reason}")
            }
        }
    }
}

impl std::error::Error for TelephonyError {}
