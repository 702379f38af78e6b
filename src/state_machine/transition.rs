//! Pure state transition function
//!
//! Given the same session, context and event this always produces the same
//! result. Network work is described as effects and carried out by the
//! runtime, which feeds the outcome back in as another event.

use super::effect::{Button, IssueQuery};
use super::event::{Action, Command};
use super::{EditSession, EditState, Effect, Event, SessionContext};
use crate::commit::CommitReceipt;
use crate::draft::{Draft, DraftElement, DraftTrace};
use crate::geo;
use crate::osmose::Issue;
use crate::pager::ResultPager;
use thiserror::Error;

pub const HELP: &str = "Send a location to create a POI or a note there, or to search issues nearby.\n\
Send a GPX file to upload a trace.\n\
/user <name> lists issues on that mapper's edits.\n\
/cancel leaves the current edit.";
pub const ACTION_PROMPT: &str = "What do you want to do?";
pub const TAG_KEY_PROMPT: &str = "please send the Tag-Name";
pub const TAG_VALUE_PROMPT: &str = "send the tag value";
pub const NOTE_TEXT_PROMPT: &str = "please send the note text";
pub const GPX_NAME_PROMPT: &str = "please send trace-name.";
pub const GPX_DESCRIPTION_PROMPT: &str = "please write a Description, or use /skip .";
pub const GPX_TAGS_PROMPT: &str = "please send tags separated by ',' or use /skip .";
pub const FAREWELL: &str = "exit edit conversation";
pub const SEARCHING: &str = "searching issues...";
pub const SAVING: &str = "saving...";
pub const NO_RESULTS: &str = "no issues found";
pub const SEARCH_UNAVAILABLE: &str = "the issue service is unavailable, please try again later";
pub const USER_USAGE: &str = "usage: /user <name>";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: EditSession,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: EditSession) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    /// Event is not valid in this state; ignored
    #[error("Unexpected {event} event in state {state}")]
    ProtocolMismatch {
        state: EditState,
        event: &'static str,
    },
    #[error("Still saving, please wait")]
    CommitInFlight,
}

fn mismatch(state: EditState, event: &'static str) -> TransitionError {
    TransitionError::ProtocolMismatch { state, event }
}

/// Pure transition function
pub fn transition(
    session: &EditSession,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let state = session.state;
    let kind = event.kind();
    let mut next = session.clone();

    match event {
        // ============================================================
        // Valid in every state
        // ============================================================
        Event::Command(Command::Start | Command::Help) => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(HELP)))
        }

        Event::IssuesLoaded { issues } => Ok(show_results(next, context, issues)),

        Event::IssueLoaded { issue } => {
            Ok(TransitionResult::new(next).with_effect(Effect::say(issue.detail())))
        }

        Event::SearchFailed { error } => {
            let text = if error.is_empty_result() {
                NO_RESULTS
            } else {
                SEARCH_UNAVAILABLE
            };
            Ok(TransitionResult::new(next).with_effect(Effect::say(text)))
        }

        // ============================================================
        // Commit outcomes
        // ============================================================

        // Outcomes of any other commit (one started before a cancel) are
        // only rendered
        Event::CommitSucceeded { commit_id, receipt } => {
            if next.awaits_commit(commit_id) && state.can_commit() {
                next.pending_commit = None;
                next.state = EditState::Terminated;
                if let (CommitReceipt::Node(id), Some(element)) = (&receipt, next.element_mut()) {
                    element.id = Some(*id);
                }
            }
            Ok(TransitionResult::new(next).with_effect(Effect::say(receipt.to_string())))
        }

        Event::CommitFailed { commit_id, message } => {
            if next.awaits_commit(commit_id) {
                next.pending_commit = None;
            }
            Ok(TransitionResult::new(next).with_effect(Effect::say(message)))
        }

        // ============================================================
        // Cancel and result paging
        // ============================================================
        Event::Command(Command::Cancel)
        | Event::Button {
            action: Action::Cancel,
        } => {
            if matches!(state, EditState::Idle | EditState::Terminated) {
                return Err(mismatch(state, kind));
            }
            next.state = EditState::Terminated;
            Ok(TransitionResult::new(next).with_effect(Effect::say(FAREWELL)))
        }

        Event::Button {
            action: Action::NextPage,
        } => turn_page(next, true).ok_or_else(|| mismatch(state, kind)),

        Event::Button {
            action: Action::PrevPage,
        } => turn_page(next, false).ok_or_else(|| mismatch(state, kind)),

        Event::Button {
            action: Action::SelectItem(index),
        } => {
            let issue_id = next
                .pager
                .as_ref()
                .and_then(|pager| pager.get_in_window(index))
                .map(|issue| issue.id.clone())
                .ok_or_else(|| mismatch(state, kind))?;
            Ok(TransitionResult::new(next).with_effect(Effect::FetchIssue { issue_id }))
        }

        // Searches by user leave the draft alone
        Event::Command(Command::User { username }) => {
            let result = match username {
                Some(username) => TransitionResult::new(next)
                    .with_effect(Effect::say(SEARCHING))
                    .with_effect(Effect::SearchIssues {
                        query: IssueQuery::ByUser { username },
                    }),
                None => TransitionResult::new(next).with_effect(Effect::say(USER_USAGE)),
            };
            Ok(result)
        }

        // Everything below may touch the draft
        _ if session.commit_in_flight() => Err(TransitionError::CommitInFlight),

        event => edit(next, context, event).ok_or_else(|| mismatch(state, kind)),
    }
}

/// Draft-building transitions; `None` means the event does not fit the state
fn edit(
    mut s: EditSession,
    context: &SessionContext,
    event: Event,
) -> Option<TransitionResult> {
    let result = match (s.state, event) {
        // ============================================================
        // Entry points
        // ============================================================
        (EditState::Idle | EditState::AwaitingAction, Event::Location { point }) => {
            s.location = Some(point);
            s.state = EditState::AwaitingAction;
            TransitionResult::new(s).with_effect(Effect::say_with_keyboard(
                ACTION_PROMPT,
                action_keyboard(),
            ))
        }

        (EditState::Idle, Event::Document { file_name, data }) => {
            s.draft = Some(Draft::Trace(DraftTrace::new(file_name, data)));
            s.state = EditState::GpxName;
            TransitionResult::new(s).with_effect(Effect::say(GPX_NAME_PROMPT))
        }

        // ============================================================
        // Action menu
        // ============================================================
        (EditState::AwaitingAction, Event::Button { action: Action::CreatePoi }) => {
            let draft = DraftElement::node(s.location?);
            let summary = draft.to_string();
            s.draft = Some(Draft::Element(draft));
            s.state = EditState::TagChoice;
            TransitionResult::new(s)
                .with_effect(Effect::say(summary))
                .with_effect(Effect::say_with_keyboard(TAG_KEY_PROMPT, draft_keyboard()))
        }

        (EditState::AwaitingAction, Event::Button { action: Action::CreateNote }) => {
            s.draft = Some(Draft::Element(DraftElement::note(s.location?)));
            s.state = EditState::TagChoice;
            TransitionResult::new(s)
                .with_effect(Effect::say_with_keyboard(NOTE_TEXT_PROMPT, draft_keyboard()))
        }

        (EditState::AwaitingAction, Event::Button { action: Action::SearchIssues }) => {
            let location = s.location?;
            s.state = EditState::Terminated;
            match geo::bounding_box(location, context.search_radius_m) {
                Ok(bbox) => TransitionResult::new(s)
                    .with_effect(Effect::say(SEARCHING))
                    .with_effect(Effect::SearchIssues {
                        query: IssueQuery::ByLocation { bbox },
                    }),
                Err(e) => TransitionResult::new(s)
                    .with_effect(Effect::say(format!("cannot search here: {e}"))),
            }
        }

        // ============================================================
        // Tag / value loop
        // ============================================================
        (EditState::TagChoice, Event::Text { text }) => {
            let element = s.element_mut()?;
            let text = text.trim();
            if element.is_note() {
                element.set_text(text);
                let summary = element.to_string();
                TransitionResult::new(s).with_effect(Effect::say_with_keyboard(
                    summary,
                    draft_keyboard(),
                ))
            } else if text.is_empty() {
                TransitionResult::new(s).with_effect(Effect::say(TAG_KEY_PROMPT))
            } else {
                s.pending_tag_key = Some(text.to_string());
                s.state = EditState::ValueReply;
                TransitionResult::new(s).with_effect(Effect::say(TAG_VALUE_PROMPT))
            }
        }

        (EditState::ValueReply, Event::Text { text }) => {
            let value = text.trim();
            if value.is_empty() {
                return Some(TransitionResult::new(s).with_effect(Effect::say(TAG_VALUE_PROMPT)));
            }
            let key = s.pending_tag_key.take()?;
            let element = s.element_mut()?;
            element.set_tag(key, value);
            let summary = element.to_string();
            s.state = EditState::TagChoice;
            TransitionResult::new(s)
                .with_effect(Effect::say(summary))
                .with_effect(Effect::say_with_keyboard(TAG_KEY_PROMPT, draft_keyboard()))
        }

        (EditState::TagChoice, Event::Command(Command::Done)) => {
            s.state = EditState::Terminated;
            TransitionResult::new(s).with_effect(Effect::say(FAREWELL))
        }

        (
            EditState::TagChoice,
            Event::Command(Command::Save) | Event::Button { action: Action::Save },
        ) => {
            let element = s.element()?;
            if !element.is_complete() {
                let hint = if element.is_note() {
                    "cannot save yet: please send the note text first"
                } else {
                    "cannot save yet: please add at least one tag"
                };
                return Some(TransitionResult::new(s).with_effect(Effect::say(hint)));
            }
            let draft = element.clone();
            let commit_id = s.begin_commit();
            TransitionResult::new(s)
                .with_effect(Effect::say(SAVING))
                .with_effect(Effect::CommitElement { commit_id, draft })
        }

        // ============================================================
        // GPX metadata
        // ============================================================
        (EditState::GpxName, Event::Text { text }) => {
            let name = text.trim();
            if name.is_empty() {
                return Some(TransitionResult::new(s).with_effect(Effect::say(GPX_NAME_PROMPT)));
            }
            s.trace_mut()?.name = Some(name.to_string());
            s.state = EditState::GpxDescription;
            TransitionResult::new(s).with_effect(Effect::say(GPX_DESCRIPTION_PROMPT))
        }

        (EditState::GpxDescription, Event::Text { text }) => {
            let description = text.trim();
            if !description.is_empty() {
                s.trace_mut()?.description = description.to_string();
            }
            s.state = EditState::GpxTag;
            TransitionResult::new(s).with_effect(Effect::say(GPX_TAGS_PROMPT))
        }

        (EditState::GpxDescription, Event::Command(Command::Skip)) => {
            s.trace()?;
            s.state = EditState::GpxTag;
            TransitionResult::new(s).with_effect(Effect::say(GPX_TAGS_PROMPT))
        }

        (EditState::GpxTag, Event::Text { text }) => {
            s.trace_mut()?.set_tags_from_text(&text);
            s.state = EditState::GpxReview;
            review(s)?
        }

        (EditState::GpxTag, Event::Command(Command::Skip)) => {
            s.state = EditState::GpxReview;
            review(s)?
        }

        (EditState::GpxReview, Event::Button { action: Action::ToggleVisibility }) => {
            s.trace_mut()?.toggle_visibility();
            review(s)?
        }

        (
            EditState::GpxReview,
            Event::Command(Command::Save) | Event::Button { action: Action::Save },
        ) => {
            let draft = s.trace()?.clone();
            let commit_id = s.begin_commit();
            TransitionResult::new(s)
                .with_effect(Effect::say(SAVING))
                .with_effect(Effect::CommitTrace { commit_id, draft })
        }

        _ => return None,
    };
    Some(result)
}

/// Install a pager over fresh results and show its first window
fn show_results(
    mut s: EditSession,
    context: &SessionContext,
    issues: Vec<Issue>,
) -> TransitionResult {
    if issues.is_empty() {
        return TransitionResult::new(s).with_effect(Effect::say(NO_RESULTS));
    }
    let mut pager = ResultPager::new(issues, context.page_size);
    let effect = page_effect(&mut pager, true);
    s.pager = Some(pager);
    TransitionResult::new(s).with_effect(effect)
}

fn turn_page(mut s: EditSession, forward: bool) -> Option<TransitionResult> {
    let effect = page_effect(s.pager.as_mut()?, forward);
    Some(TransitionResult::new(s).with_effect(effect))
}

fn page_effect(pager: &mut ResultPager<Issue>, forward: bool) -> Effect {
    let total = pager.len();
    let paged = total > pager.window_size();
    let window = if forward { pager.next() } else { pager.prev() };
    if window.is_empty() {
        Effect::say(NO_RESULTS)
    } else {
        Effect::say_with_keyboard(
            format_window(window, total),
            pager_keyboard(window.len(), paged),
        )
    }
}

fn format_window(window: &[Issue], total: usize) -> String {
    let mut text = format!("found {total} issues:");
    for (i, issue) in window.iter().enumerate() {
        text.push_str(&format!("\n{}. {issue}", i + 1));
    }
    text
}

fn review(s: EditSession) -> Option<TransitionResult> {
    let trace = s.trace()?;
    let text = trace.to_string();
    let keyboard = vec![
        vec![
            Button::new(format!("visibility: {}", trace.visibility), "vis"),
            Button::new("Upload", "save"),
        ],
        vec![Button::new("Cancel", "cancel")],
    ];
    Some(TransitionResult::new(s).with_effect(Effect::say_with_keyboard(text, keyboard)))
}

fn action_keyboard() -> Vec<Vec<Button>> {
    vec![vec![
        Button::new("Cr. Note", "note"),
        Button::new("Cr. POI", "poi"),
        Button::new("search Issues", "issues"),
    ]]
}

fn draft_keyboard() -> Vec<Vec<Button>> {
    vec![vec![Button::new("Save", "save"), Button::new("Cancel", "cancel")]]
}

/// Numbered selection buttons, five per row, then prev/next when paged
fn pager_keyboard(count: usize, paged: bool) -> Vec<Vec<Button>> {
    let numbers: Vec<Button> = (1..=count)
        .map(|n| Button::new(n.to_string(), Action::SelectItem(n - 1).data()))
        .collect();
    let mut rows: Vec<Vec<Button>> = numbers.chunks(5).map(<[Button]>::to_vec).collect();
    if paged {
        rows.push(vec![
            Button::new("<<", Action::PrevPage.data()),
            Button::new(">>", Action::NextPage.data()),
        ]);
    }
    rows
}
