//! Edit session state types

use crate::draft::{Draft, DraftElement, DraftTrace};
use crate::geo::GeoPoint;
use crate::osmose::Issue;
use crate::pager::{ResultPager, DEFAULT_WINDOW_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a user is in the editing conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditState {
    /// Nothing in progress; waiting for a location, a document or a command
    #[default]
    Idle,
    /// Location captured, action menu shown
    AwaitingAction,
    /// Building a node or note; next text is a tag key (or the note body)
    TagChoice,
    /// Tag key stored; next text is its value
    ValueReply,
    GpxName,
    GpxDescription,
    GpxTag,
    /// Trace metadata complete, waiting for visibility toggles or upload
    GpxReview,
    /// Absorbing; the runtime discards the session
    Terminated,
}

impl EditState {
    pub fn as_str(self) -> &'static str {
        match self {
            EditState::Idle => "idle",
            EditState::AwaitingAction => "awaiting_action",
            EditState::TagChoice => "tag_choice",
            EditState::ValueReply => "value_reply",
            EditState::GpxName => "gpx_name",
            EditState::GpxDescription => "gpx_description",
            EditState::GpxTag => "gpx_tag",
            EditState::GpxReview => "gpx_review",
            EditState::Terminated => "terminated",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == EditState::Terminated
    }

    /// States in which a commit may be started
    pub fn can_commit(self) -> bool {
        matches!(self, EditState::TagChoice | EditState::GpxReview)
    }
}

impl fmt::Display for EditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the bot remembers about one user between events
#[derive(Debug, Clone)]
pub struct EditSession {
    pub user_id: String,
    pub state: EditState,
    /// Captured by a location message in `Idle`
    pub location: Option<GeoPoint>,
    pub draft: Option<Draft>,
    pub pending_tag_key: Option<String>,
    pub pager: Option<ResultPager<Issue>>,
    /// Id of the commit whose outcome this session is waiting for
    pub pending_commit: Option<u64>,
    /// Last commit id handed out; survives [`EditSession::restart`]
    pub commit_seq: u64,
}

impl EditSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: EditState::Idle,
            location: None,
            draft: None,
            pending_tag_key: None,
            pager: None,
            pending_commit: None,
            commit_seq: 0,
        }
    }

    /// Fresh `Idle` session for the same user.
    ///
    /// Commit ids keep counting so that a late outcome from before the
    /// restart can never match a commit started after it.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self {
            commit_seq: self.commit_seq,
            ..Self::new(self.user_id.clone())
        }
    }

    pub fn commit_in_flight(&self) -> bool {
        self.pending_commit.is_some()
    }

    /// Hand out the id for a new commit and mark it pending
    pub fn begin_commit(&mut self) -> u64 {
        self.commit_seq += 1;
        self.pending_commit = Some(self.commit_seq);
        self.commit_seq
    }

    /// Whether `commit_id` is the commit this session is waiting for
    pub fn awaits_commit(&self, commit_id: u64) -> bool {
        self.pending_commit == Some(commit_id)
    }

    pub fn element(&self) -> Option<&DraftElement> {
        match &self.draft {
            Some(Draft::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut DraftElement> {
        match &mut self.draft {
            Some(Draft::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn trace(&self) -> Option<&DraftTrace> {
        match &self.draft {
            Some(Draft::Trace(trace)) => Some(trace),
            _ => None,
        }
    }

    pub fn trace_mut(&mut self) -> Option<&mut DraftTrace> {
        match &mut self.draft {
            Some(Draft::Trace(trace)) => Some(trace),
            _ => None,
        }
    }
}

/// Per-user settings the transition function reads but never changes
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    /// Issues shown per pager window
    pub page_size: usize,
    /// Radius of the "search issues nearby" box
    pub search_radius_m: f64,
}

/// Radius used when no configuration overrides it
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 500.0;

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            page_size: DEFAULT_WINDOW_SIZE,
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_search_radius(mut self, radius_m: f64) -> Self {
        self.search_radius_m = radius_m;
        self
    }
}
