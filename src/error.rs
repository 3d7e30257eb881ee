//! Client error types.
//!
//! [`ClientError`] is the single failure type returned by every remote
//! call, session operation and watcher in the crate. Each variant maps to
//! an [`ErrorKind`] and a stable numeric code so callers can branch on the
//! category without matching on messages.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::domain::subscription::RosterError;

/// Coarse failure category of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The backend answered with a non-success status or an error body.
    Remote,
    /// The response body could not be decoded.
    Decode,
    /// The caller supplied invalid input; no request was sent.
    Validation,
    /// No usable session is available.
    Session,
    /// The local session store failed.
    Storage,
    /// Configuration could not be loaded.
    Config,
}

/// Error body shape returned by the backend: `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable message from the backend.
    pub error: String,
}

/// Client error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category            |
/// |-----------|---------------------|
/// | 1000–1999 | Validation          |
/// | 2000–2999 | Remote state        |
/// | 3000–3999 | Transport / decode  |
/// | 4000–4999 | Session / local     |
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request failed before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured deadline.
    #[error("request timed out")]
    Timeout,

    /// The backend returned a non-success status.
    #[error("backend returned {status}: {message}")]
    Http {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Message extracted from the error body, or the status reason.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Input rejected before any request was issued.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No session is active.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The stored session is past its expiry.
    #[error("session expired")]
    SessionExpired,

    /// The session user may not perform this action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A subscription transition is not valid from the current state.
    #[error("conflict: {0}")]
    Conflict(#[from] RosterError),

    /// Reading or writing the session store failed.
    #[error("session storage error: {0}")]
    Storage(String),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns the failure category for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Timeout => ErrorKind::Transport,
            Self::Http { .. } | Self::Forbidden(_) | Self::Conflict(_) => ErrorKind::Remote,
            Self::Decode(_) => ErrorKind::Decode,
            Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::NotAuthenticated | Self::SessionExpired => ErrorKind::Session,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Http { .. } => 2001,
            Self::Forbidden(_) => 2002,
            Self::Conflict(_) => 2003,
            Self::Network(_) => 3001,
            Self::Timeout => 3002,
            Self::Decode(_) => 3003,
            Self::NotAuthenticated => 4001,
            Self::SessionExpired => 4002,
            Self::Storage(_) => 4003,
            Self::Config(_) => 4004,
        }
    }

    /// Returns the HTTP status when the backend produced one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the backend reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Builds an [`ClientError::Http`] from a status and raw response body.
    ///
    /// Uses the body's `error` field when present, then the raw text, then
    /// the canonical reason phrase.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| b.error)
            .ok()
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string()
            });
        Self::Http { status, message }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
