//! Persisting finished drafts
//!
//! The gateway turns a draft into map API calls. Each call is one logical
//! operation with no retry; on failure the caller keeps the draft.

use crate::draft::{DraftElement, DraftKind, DraftTrace};
use crate::geo::GeoPoint;
use crate::osm::{ElementId, NoteId, OsmApi, OsmError, OsmErrorKind, TraceId, TraceUpload};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifier assigned by the map API to a committed draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CommitReceipt {
    Node(ElementId),
    Note(NoteId),
    Trace(TraceId),
}

impl fmt::Display for CommitReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitReceipt::Node(id) => write!(f, "created node: {id}"),
            CommitReceipt::Note(id) => write!(f, "created note: {id}"),
            CommitReceipt::Trace(id) => write!(f, "uploaded track: {id}"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CommitError {
    /// Draft is missing tags or note text
    #[error("Draft is incomplete: {0}")]
    Incomplete(String),
    #[error("Map API rejected the change: {0}")]
    Api(#[from] OsmError),
}

impl CommitError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CommitError::Incomplete(_) => false,
            CommitError::Api(e) => e.kind.is_retryable(),
        }
    }

    /// Short text for the chat user
    pub fn user_message(&self) -> String {
        match self {
            CommitError::Incomplete(reason) => format!("cannot save yet: {reason}"),
            CommitError::Api(e) if e.kind == OsmErrorKind::Auth => {
                "saving failed: the bot has no valid OSM credentials".to_string()
            }
            CommitError::Api(e) if e.kind.is_retryable() => {
                format!("saving failed ({e}), please try /save again")
            }
            CommitError::Api(e) => format!("saving failed: {e}"),
        }
    }
}

/// Writes completed drafts to the map
#[async_trait]
pub trait CommitGateway: Send + Sync {
    /// Create a node (inside its own changeset) or a note
    async fn create_element(&self, draft: &DraftElement) -> Result<CommitReceipt, CommitError>;

    /// Upload a GPX trace with its metadata
    async fn upload_trace(&self, draft: &DraftTrace) -> Result<CommitReceipt, CommitError>;
}

/// Gateway backed by the OSM API 0.6
pub struct OsmCommitGateway {
    api: OsmApi,
    comment: String,
}

impl OsmCommitGateway {
    pub fn new(api: OsmApi, comment: impl Into<String>) -> Self {
        Self {
            api,
            comment: comment.into(),
        }
    }

    fn changeset_tags(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("comment".to_string(), self.comment.clone()),
            ("created_by".to_string(), "osmate".to_string()),
        ])
    }

    async fn create_node(
        &self,
        location: GeoPoint,
        tags: &BTreeMap<String, String>,
    ) -> Result<ElementId, OsmError> {
        let changeset = self.api.create_changeset(&self.changeset_tags()).await?;
        tracing::debug!(changeset, "Changeset opened");

        let created = self.api.create_node(changeset, location, tags).await;

        // Close even when the create failed so the changeset does not linger
        if let Err(e) = self.api.close_changeset(changeset).await {
            tracing::warn!(changeset, error = %e, "Failed to close changeset");
        }
        created
    }
}

#[async_trait]
impl CommitGateway for OsmCommitGateway {
    async fn create_element(&self, draft: &DraftElement) -> Result<CommitReceipt, CommitError> {
        if !draft.is_complete() {
            let reason = if draft.is_note() {
                "the note has no text"
            } else {
                "add at least one tag"
            };
            return Err(CommitError::Incomplete(reason.to_string()));
        }

        let start = std::time::Instant::now();
        let result = match &draft.kind {
            DraftKind::Node { location } => self
                .create_node(*location, &draft.tags)
                .await
                .map(CommitReceipt::Node),
            DraftKind::Note { location, text } => self
                .api
                .create_note(*location, text.as_deref().unwrap_or_default())
                .await
                .map(CommitReceipt::Note),
        };

        match &result {
            Ok(receipt) => tracing::info!(
                duration_ms = %start.elapsed().as_millis(),
                receipt = %receipt,
                "Element committed"
            ),
            Err(e) => tracing::error!(
                duration_ms = %start.elapsed().as_millis(),
                error = %e,
                retryable = e.kind.is_retryable(),
                "Element commit failed"
            ),
        }
        Ok(result?)
    }

    async fn upload_trace(&self, draft: &DraftTrace) -> Result<CommitReceipt, CommitError> {
        let start = std::time::Instant::now();
        let upload = TraceUpload {
            data: &draft.data,
            file_name: draft.upload_name(),
            description: &draft.description,
            tags: draft.tags.iter().map(String::as_str).collect(),
            visibility: draft.visibility,
        };
        let result = self.api.upload_trace(upload).await;

        match &result {
            Ok(id) => tracing::info!(
                duration_ms = %start.elapsed().as_millis(),
                trace_id = *id,
                bytes = draft.data.len(),
                "Trace uploaded"
            ),
            Err(e) => tracing::error!(
                duration_ms = %start.elapsed().as_millis(),
                error = %e,
                retryable = e.kind.is_retryable(),
                "Trace upload failed"
            ),
        }
        Ok(CommitReceipt::Trace(result?))
    }
}
