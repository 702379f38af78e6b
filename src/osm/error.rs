//! Map API error types

use thiserror::Error;

/// Map API error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OsmError {
    pub kind: OsmErrorKind,
    pub message: String,
}

impl OsmError {
    pub fn new(kind: OsmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(OsmErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(OsmErrorKind::Auth, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(OsmErrorKind::InvalidResponse, message)
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::new(OsmErrorKind::InvalidRequest, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = body.trim();
        match status.as_u16() {
            401 | 403 => Self::auth(format!("Authentication failed: {body}")),
            404 | 410 => Self::new(OsmErrorKind::NotFound, format!("Not found: {body}")),
            409 | 412 => Self::new(OsmErrorKind::Conflict, format!("Conflict: {body}")),
            400 => Self::new(OsmErrorKind::InvalidRequest, format!("Bad request: {body}")),
            429 => Self::new(OsmErrorKind::RateLimit, format!("Rate limited: {body}")),
            500..=599 => Self::new(
                OsmErrorKind::ServerError,
                format!("Server error {status}: {body}"),
            ),
            _ => Self::new(
                OsmErrorKind::Unknown,
                format!("Unexpected status {status}: {body}"),
            ),
        }
    }
}

impl From<reqwest::Error> for OsmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::network(format!("Request timed out: {e}"))
        } else if e.is_decode() {
            Self::invalid_response(format!("Failed to decode response: {e}"))
        } else {
            Self::network(format!("Request failed: {e}"))
        }
    }
}

/// Error classification for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsmErrorKind {
    /// Connection failures and timeouts
    Network,
    /// Missing or rejected credentials (401, 403)
    Auth,
    /// Element, note or changeset does not exist (404, 410)
    NotFound,
    /// Version or changeset conflict (409, 412)
    Conflict,
    /// Rejected payload (400)
    InvalidRequest,
    /// Too many requests (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Body did not parse
    InvalidResponse,
    Unknown,
}

impl OsmErrorKind {
    /// Whether retrying the same request later may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
