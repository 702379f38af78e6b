//! Osmose API 0.3 client

use super::types::{IssueDetail, IssueList};
use super::{Issue, IssueError, IssueService};
use crate::geo::BoundingBox;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Public Osmose endpoint
pub const DEFAULT_OSMOSE_URL: &str = "http://osmose.openstreetmap.fr/en/api/0.3";

/// Result cap for area searches
const BBOX_LIMIT: u32 = 50;

/// Result cap for per-user searches
const USER_LIMIT: u32 = 53;

/// HTTP client for the Osmose issue API
#[derive(Clone)]
pub struct OsmoseClient {
    client: Client,
    base_url: String,
}

impl OsmoseClient {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IssueError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("osmate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IssueError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn issues_url(&self) -> String {
        format!("{}/issues", self.base_url)
    }

    fn issue_url(&self, id: &str) -> String {
        format!("{}/issue/{id}", self.base_url)
    }

    async fn search(&self, query: &[(&str, String)]) -> Result<Vec<Issue>, IssueError> {
        let response = self
            .client
            .get(self.issues_url())
            .query(&[("full", "true")])
            .query(query)
            .send()
            .await?;
        let list: IssueList = decode(response).await?;
        let issues: Vec<Issue> = list.issues.into_iter().map(Issue::from).collect();
        if issues.is_empty() {
            return Err(IssueError::NoResults);
        }
        Ok(issues)
    }
}

#[async_trait]
impl IssueService for OsmoseClient {
    async fn search_by_location(&self, bbox: BoundingBox) -> Result<Vec<Issue>, IssueError> {
        self.search(&[
            ("bbox", bbox.to_query()),
            ("limit", BBOX_LIMIT.to_string()),
        ])
        .await
    }

    async fn search_by_user(&self, username: &str) -> Result<Vec<Issue>, IssueError> {
        self.search(&[
            ("username", username.to_string()),
            ("limit", USER_LIMIT.to_string()),
        ])
        .await
    }

    async fn get_issue(&self, id: &str) -> Result<Issue, IssueError> {
        let response = self.client.get(self.issue_url(id)).send().await?;
        let detail: IssueDetail = decode(response).await?;
        Ok(detail.into_issue(id))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, IssueError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(IssueError::from_status(status, &body));
    }
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| IssueError::InvalidResponse(e.to_string()))
}
