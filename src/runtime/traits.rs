//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::commit::{CommitError, CommitGateway, CommitReceipt};
use crate::draft::{DraftElement, DraftTrace};
use crate::osm::OsmApi;
use crate::osmose::{Issue, IssueError, IssueService};
use crate::state_machine::IssueQuery;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of issue search results and details
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Run a search; an empty result is `IssueError::NoResults`
    async fn search(&self, query: &IssueQuery) -> Result<Vec<Issue>, IssueError>;

    /// Load one issue with its member elements
    async fn get_issue(&self, issue_id: &str) -> Result<Issue, IssueError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: IssueSource + ?Sized> IssueSource for Arc<T> {
    async fn search(&self, query: &IssueQuery) -> Result<Vec<Issue>, IssueError> {
        (**self).search(query).await
    }

    async fn get_issue(&self, issue_id: &str) -> Result<Issue, IssueError> {
        (**self).get_issue(issue_id).await
    }
}

#[async_trait]
impl<T: CommitGateway + ?Sized> CommitGateway for Arc<T> {
    async fn create_element(&self, draft: &DraftElement) -> Result<CommitReceipt, CommitError> {
        (**self).create_element(draft).await
    }

    async fn upload_trace(&self, draft: &DraftTrace) -> Result<CommitReceipt, CommitError> {
        (**self).upload_trace(draft).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use an [`IssueService`] as [`IssueSource`]
pub struct ServiceIssueSource {
    service: Arc<dyn IssueService>,
    elements: Option<OsmApi>,
}

impl ServiceIssueSource {
    pub fn new(service: Arc<dyn IssueService>) -> Self {
        Self {
            service,
            elements: None,
        }
    }

    /// Fill in tags of issue members the issue service sent bare
    #[must_use]
    pub fn with_element_lookup(mut self, api: OsmApi) -> Self {
        self.elements = Some(api);
        self
    }

    async fn complete_members(&self, issue: &mut Issue) {
        let Some(api) = &self.elements else {
            return;
        };
        for element in issue.elements.iter_mut().filter(|e| e.tags.is_empty()) {
            match api.get_element(element.kind, element.id).await {
                Ok(full) => element.tags.clone_from(&full.header().tags),
                Err(e) => tracing::warn!(
                    issue_id = %issue.id,
                    element = %element,
                    error = %e,
                    "Element lookup failed"
                ),
            }
        }
    }
}

#[async_trait]
impl IssueSource for ServiceIssueSource {
    async fn search(&self, query: &IssueQuery) -> Result<Vec<Issue>, IssueError> {
        match query {
            IssueQuery::ByLocation { bbox } => self.service.search_by_location(*bbox).await,
            IssueQuery::ByUser { username } => self.service.search_by_user(username).await,
        }
    }

    async fn get_issue(&self, issue_id: &str) -> Result<Issue, IssueError> {
        let mut issue = self.service.get_issue(issue_id).await?;
        self.complete_members(&mut issue).await;
        Ok(issue)
    }
}
