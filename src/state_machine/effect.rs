//! Effects produced by state transitions

use crate::draft::{DraftElement, DraftTrace};
use crate::geo::BoundingBox;
use serde::Serialize;

/// A labeled inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    /// Callback data returned when pressed
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Message for the chat transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderRequest {
    pub text: String,
    /// Rows of buttons; empty when the message has no keyboard
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyboard: Vec<Vec<Button>>,
}

/// Which issues to look up
#[derive(Debug, Clone, PartialEq)]
pub enum IssueQuery {
    ByLocation { bbox: BoundingBox },
    ByUser { username: String },
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message to the user
    Render(RenderRequest),

    /// Search issues (spawns as background task)
    SearchIssues { query: IssueQuery },

    /// Load issue detail (spawns as background task)
    FetchIssue { issue_id: String },

    /// Persist a node or note (spawns as background task)
    CommitElement { commit_id: u64, draft: DraftElement },

    /// Upload a trace (spawns as background task)
    CommitTrace { commit_id: u64, draft: DraftTrace },
}

impl Effect {
    pub fn say(text: impl Into<String>) -> Self {
        Effect::Render(RenderRequest {
            text: text.into(),
            keyboard: Vec::new(),
        })
    }

    pub fn say_with_keyboard(text: impl Into<String>, keyboard: Vec<Vec<Button>>) -> Self {
        Effect::Render(RenderRequest {
            text: text.into(),
            keyboard,
        })
    }

    /// Text of a render effect
    pub fn rendered_text(&self) -> Option<&str> {
        match self {
            Effect::Render(request) => Some(&request.text),
            _ => None,
        }
    }
}
