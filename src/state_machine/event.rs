//! Events that can reach an edit session

use crate::commit::CommitReceipt;
use crate::geo::GeoPoint;
use crate::osmose::{Issue, IssueError};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    Text {
        text: String,
    },
    Location {
        point: GeoPoint,
    },
    Document {
        file_name: String,
        data: Vec<u8>,
    },
    Button {
        action: Action,
    },
    Command(Command),

    // Issue search results
    IssuesLoaded {
        issues: Vec<Issue>,
    },
    IssueLoaded {
        issue: Issue,
    },
    SearchFailed {
        error: IssueError,
    },

    // Commit results, tagged with the id from the commit effect
    CommitSucceeded {
        commit_id: u64,
        receipt: CommitReceipt,
    },
    CommitFailed {
        commit_id: u64,
        message: String,
    },
}

impl Event {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Text { .. } => "text",
            Event::Location { .. } => "location",
            Event::Document { .. } => "document",
            Event::Button { .. } => "button",
            Event::Command(_) => "command",
            Event::IssuesLoaded { .. } => "issues_loaded",
            Event::IssueLoaded { .. } => "issue_loaded",
            Event::SearchFailed { .. } => "search_failed",
            Event::CommitSucceeded { .. } => "commit_succeeded",
            Event::CommitFailed { .. } => "commit_failed",
        }
    }

    /// Whether the event came from the user rather than a background task
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Event::Text { .. }
                | Event::Location { .. }
                | Event::Document { .. }
                | Event::Button { .. }
                | Event::Command(_)
        )
    }

    pub fn text(text: impl Into<String>) -> Self {
        Event::Text { text: text.into() }
    }

    pub fn button(data: &str) -> Self {
        Event::Button {
            action: Action::parse(data),
        }
    }

    /// Classify a chat message: a leading `/` makes it a command
    pub fn from_message(text: &str) -> Self {
        match Command::parse(text) {
            Some(command) => Event::Command(command),
            None => Event::text(text),
        }
    }
}

/// Inline keyboard action, decoded from the button's callback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreatePoi,
    CreateNote,
    SearchIssues,
    ToggleVisibility,
    Save,
    Cancel,
    NextPage,
    PrevPage,
    /// Zero-based position inside the displayed window
    SelectItem(usize),
    Unknown(String),
}

impl Action {
    /// Decode callback data; numbered buttons are one-based
    pub fn parse(data: &str) -> Self {
        match data.trim() {
            "poi" => Action::CreatePoi,
            "note" => Action::CreateNote,
            "issues" => Action::SearchIssues,
            "vis" => Action::ToggleVisibility,
            "save" => Action::Save,
            "cancel" => Action::Cancel,
            "next" => Action::NextPage,
            "prev" => Action::PrevPage,
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 => Action::SelectItem(n - 1),
                _ => Action::Unknown(other.to_string()),
            },
        }
    }

    /// Callback data for this action
    pub fn data(&self) -> String {
        match self {
            Action::CreatePoi => "poi".to_string(),
            Action::CreateNote => "note".to_string(),
            Action::SearchIssues => "issues".to_string(),
            Action::ToggleVisibility => "vis".to_string(),
            Action::Save => "save".to_string(),
            Action::Cancel => "cancel".to_string(),
            Action::NextPage => "next".to_string(),
            Action::PrevPage => "prev".to_string(),
            Action::SelectItem(index) => (index + 1).to_string(),
            Action::Unknown(data) => data.clone(),
        }
    }
}

/// Slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Skip,
    Done,
    Cancel,
    Save,
    /// `/user <name>`; the name may be missing
    User {
        username: Option<String>,
    },
    Unknown {
        name: String,
    },
}

impl Command {
    /// Parse a `/name args...` message. Returns `None` for plain text.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.next().unwrap_or_default().split_whitespace().collect();
        Some(Self::from_parts(name, &args))
    }

    /// Build from a command name (without `/`) and its arguments.
    ///
    /// Chat clients append `@botname` to commands in groups; the suffix is
    /// dropped.
    pub fn from_parts(name: &str, args: &[&str]) -> Self {
        let name = name.split('@').next().unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "skip" => Command::Skip,
            "done" => Command::Done,
            "cancel" => Command::Cancel,
            "save" => Command::Save,
            "user" => Command::User {
                username: (!args.is_empty()).then(|| args.join(" ")),
            },
            _ => Command::Unknown {
                name: name.to_string(),
            },
        }
    }
}
