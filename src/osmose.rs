//! Issue search
//!
//! Reads data-quality issues from the Osmose QA service.

mod client;
mod error;
mod types;

pub use client::{OsmoseClient, DEFAULT_OSMOSE_URL};
pub use error::IssueError;
pub use types::Issue;

use crate::geo::BoundingBox;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for issue backends
#[async_trait]
pub trait IssueService: Send + Sync {
    /// Issues inside `bbox`; `NoResults` when there are none
    async fn search_by_location(&self, bbox: BoundingBox) -> Result<Vec<Issue>, IssueError>;

    /// Issues on elements last touched by `username`; `NoResults` when there are none
    async fn search_by_user(&self, username: &str) -> Result<Vec<Issue>, IssueError>;

    /// Full issue with bbox and tagged member elements
    async fn get_issue(&self, id: &str) -> Result<Issue, IssueError>;
}

/// Logging wrapper for issue services
pub struct LoggingIssueService {
    inner: Arc<dyn IssueService>,
}

impl LoggingIssueService {
    pub fn new(inner: Arc<dyn IssueService>) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(
    operation: &str,
    started: std::time::Instant,
    result: &Result<T, IssueError>,
    count: impl Fn(&T) -> usize,
) {
    let duration = started.elapsed();
    match result {
        Ok(value) => {
            tracing::info!(
                operation,
                duration_ms = %duration.as_millis(),
                count = count(value),
                "Issue request completed"
            );
        }
        Err(e) if e.is_empty_result() => {
            tracing::info!(
                operation,
                duration_ms = %duration.as_millis(),
                "Issue request found nothing"
            );
        }
        Err(e) => {
            tracing::warn!(
                operation,
                duration_ms = %duration.as_millis(),
                error = %e,
                "Issue request failed"
            );
        }
    }
}

#[async_trait]
impl IssueService for LoggingIssueService {
    async fn search_by_location(&self, bbox: BoundingBox) -> Result<Vec<Issue>, IssueError> {
        let start = std::time::Instant::now();
        let result = self.inner.search_by_location(bbox).await;
        log_outcome("search_by_location", start, &result, Vec::len);
        result
    }

    async fn search_by_user(&self, username: &str) -> Result<Vec<Issue>, IssueError> {
        let start = std::time::Instant::now();
        let result = self.inner.search_by_user(username).await;
        log_outcome("search_by_user", start, &result, Vec::len);
        result
    }

    async fn get_issue(&self, id: &str) -> Result<Issue, IssueError> {
        let start = std::time::Instant::now();
        let result = self.inner.get_issue(id).await;
        log_outcome("get_issue", start, &result, |issue| issue.elements.len());
        result
    }
}
