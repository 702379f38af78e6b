//! Issue search errors

use thiserror::Error;

/// Issue service failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IssueError {
    /// The query matched nothing
    #[error("No issues found")]
    NoResults,
    /// Connection failure, timeout or 5xx
    #[error("Issue service unavailable: {0}")]
    Unavailable(String),
    /// Body did not match the expected shape
    #[error("Malformed issue response: {0}")]
    InvalidResponse(String),
    /// Unknown issue id (404)
    #[error("Issue not found: {0}")]
    NotFound(String),
}

impl IssueError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = body.trim();
        match status.as_u16() {
            404 | 410 => Self::NotFound(body.to_string()),
            _ => Self::Unavailable(format!("status {status}: {body}")),
        }
    }

    /// Whether the user should be told "nothing found" rather than "try later"
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::NoResults | Self::NotFound(_))
    }
}

impl From<reqwest::Error> for IssueError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}
