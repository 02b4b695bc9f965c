//! Error types surfaced by every API call.
//!
//! Callers only ever see "resolved with data" or "rejected with an `ApiError`";
//! `Display` is the human-readable message shown to the user.

use std::time::Duration;

use thiserror::Error;

use crate::session::store::StoreError;

/// Fallback text when the backend rejects a call without a message.
pub const GENERIC_FAILURE: &str = "Request failed";
pub const SESSION_EXPIRED: &str = "Session expired, please log in again";
pub const FORBIDDEN: &str = "You do not have permission to access this resource";
pub const NOT_FOUND: &str = "The requested resource does not exist";
pub const SERVER_ERROR: &str = "Internal server error";
pub const NETWORK_UNREACHABLE: &str = "Network connection error, please check your network";

/// When the login redirect fires after a 401.
///
/// An envelope 401 redirects immediately; a transport-level 401 waits for the
/// configured delay so the notice has time to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTiming {
    Immediate,
    Delayed,
}

impl RedirectTiming {
    pub fn delay(self, configured: Duration) -> Duration {
        match self {
            RedirectTiming::Immediate => Duration::ZERO,
            RedirectTiming::Delayed => configured,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required parameter was missing; no request was issued.
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Business { code: i64, message: String },

    #[error("{message}")]
    SessionExpired {
        message: String,
        timing: RedirectTiming,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Server(String),

    #[error("{message}")]
    Status { status: u16, message: String },

    /// No response was received at all.
    #[error("{0}")]
    Network(String),

    /// The request could not be constructed.
    #[error("Invalid request: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Whether the host should be shown a notice for this error.
    ///
    /// Local validation and decode failures are programming or input errors
    /// reported straight to the caller.
    pub fn is_notified(&self) -> bool {
        !matches!(
            self,
            ApiError::Validation(_) | ApiError::Decode(_) | ApiError::Storage(_)
        )
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }

    /// HTTP-ish status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::SessionExpired { .. } => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Server(_) => Some(500),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Business { code, .. } => u16::try_from(*code).ok(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
