//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::event::{Action, Command};
use super::transition::*;
use super::*;
use crate::draft::Visibility;
use crate::geo::GeoPoint;
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("prop-user")
}

/// Apply events in order, skipping rejected ones
fn drive(mut session: EditSession, events: Vec<Event>) -> EditSession {
    for event in events {
        if let Ok(result) = transition(&session, &test_context(), event) {
            session = result.new_session;
        }
    }
    session
}

fn node_session() -> EditSession {
    drive(
        EditSession::new("prop-user"),
        vec![
            Event::Location {
                point: GeoPoint::new(48.0, 11.0),
            },
            Event::button("poi"),
        ],
    )
}

fn review_session() -> EditSession {
    drive(
        EditSession::new("prop-user"),
        vec![
            Event::Document {
                file_name: "trail.gpx".into(),
                data: vec![0u8; 4],
            },
            Event::text("trail.gpx"),
            Event::Command(Command::Skip),
            Event::Command(Command::Skip),
        ],
    )
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tag_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(("[a-z]{1,4}", "[a-zA-Z0-9]{1,6}"), 0..12)
}

fn arb_state() -> impl Strategy<Value = EditState> {
    prop_oneof![
        Just(EditState::Idle),
        Just(EditState::AwaitingAction),
        Just(EditState::TagChoice),
        Just(EditState::ValueReply),
        Just(EditState::GpxName),
        Just(EditState::GpxDescription),
        Just(EditState::GpxTag),
        Just(EditState::GpxReview),
        Just(EditState::Terminated),
    ]
}

fn arb_user_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,10}".prop_map(Event::text),
        "[a-z0-9]{0,6}"
            .prop_filter("cancel leaves the session", |data| data != "cancel")
            .prop_map(|data| Event::button(&data)),
        prop_oneof![
            Just(Command::Skip),
            Just(Command::Done),
            Just(Command::Save),
            Just(Command::Start),
        ]
        .prop_map(Event::Command),
        (-80.0f64..80.0, -170.0f64..170.0)
            .prop_map(|(lat, lon)| Event::Location { point: GeoPoint::new(lat, lon) }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Alternating key/value texts then /done terminates with exactly those
    /// tags, later values replacing earlier ones
    #[test]
    fn tag_loop_converges(pairs in arb_tag_pairs()) {
        let mut events = Vec::new();
        let mut expected = BTreeMap::new();
        for (key, value) in &pairs {
            events.push(Event::text(key.clone()));
            events.push(Event::text(value.clone()));
            expected.insert(key.clone(), value.clone());
        }
        events.push(Event::Command(Command::Done));

        let session = drive(node_session(), events);
        prop_assert_eq!(session.state, EditState::Terminated);
        prop_assert_eq!(&session.element().unwrap().tags, &expected);
    }

    /// Four visibility toggles at review restore the starting visibility
    #[test]
    fn visibility_toggle_closes(extra in 0usize..4) {
        let start = drive(review_session(), vec![Event::button("vis"); extra]);
        let before = start.trace().unwrap().visibility;
        let after = drive(start, vec![Event::button("vis"); 4]);
        prop_assert_eq!(after.trace().unwrap().visibility, before);
        prop_assert_eq!(after.state, EditState::GpxReview);
    }

    /// While a commit is in flight the draft never changes
    #[test]
    fn draft_frozen_while_saving(events in proptest::collection::vec(arb_user_event(), 0..20)) {
        let saving = drive(
            node_session(),
            vec![Event::text("amenity"), Event::text("bench"), Event::button("save")],
        );
        prop_assume!(saving.commit_in_flight());

        let mut session = saving.clone();
        for event in events {
            match transition(&session, &test_context(), event) {
                Ok(result) => session = result.new_session,
                Err(TransitionError::CommitInFlight | TransitionError::ProtocolMismatch { .. }) => {}
            }
        }
        prop_assert_eq!(session.draft, saving.draft);
        prop_assert_eq!(session.state, EditState::TagChoice);
    }

    /// /help renders usage without moving the state
    #[test]
    fn help_is_accepted_everywhere(state in arb_state()) {
        let mut session = EditSession::new("prop-user");
        session.state = state;
        let result = transition(&session, &test_context(), Event::Command(Command::Help)).unwrap();
        prop_assert_eq!(result.new_session.state, state);
        prop_assert_eq!(result.effects.len(), 1);
    }

    /// Unknown button data is always a protocol mismatch
    #[test]
    fn unknown_buttons_are_ignored(state in arb_state(), data in "[a-z]{3,8}") {
        let action = Action::parse(&data);
        prop_assume!(matches!(action, Action::Unknown(_)));
        let mut session = EditSession::new("prop-user");
        session.state = state;
        let err = transition(&session, &test_context(), Event::Button { action }).unwrap_err();
        let is_mismatch = matches!(err, TransitionError::ProtocolMismatch { .. });
        prop_assert!(is_mismatch);
    }
}

#[test]
fn gpx_upload_scenario() {
    let session = drive(
        EditSession::new("prop-user"),
        vec![Event::Document {
            file_name: "upload.gpx".into(),
            data: b"<gpx/>".to_vec(),
        }],
    );
    assert_eq!(session.state, EditState::GpxName);

    let session = drive(session, vec![Event::text("trail.gpx")]);
    assert_eq!(session.state, EditState::GpxDescription);

    let session = drive(session, vec![Event::Command(Command::Skip)]);
    assert_eq!(session.state, EditState::GpxTag);
    assert_eq!(session.trace().unwrap().description, "no Description");

    let session = drive(session, vec![Event::Command(Command::Skip)]);
    assert_eq!(session.state, EditState::GpxReview);
    assert!(session.trace().unwrap().tags.is_empty());

    let result = transition(&session, &test_context(), Event::button("save")).unwrap();
    let commits: Vec<&Effect> = result
        .effects
        .iter()
        .filter(|e| matches!(e, Effect::CommitTrace { .. }))
        .collect();
    assert_eq!(commits.len(), 1);
    match commits[0] {
        Effect::CommitTrace { draft, .. } => {
            assert_eq!(draft.data, b"<gpx/>".to_vec());
            assert_eq!(draft.upload_name(), "trail.gpx");
            assert_eq!(draft.description, "no Description");
            assert!(draft.tags.is_empty());
            assert_eq!(draft.visibility, Visibility::Trackable);
        }
        other => panic!("expected trace commit, got {other:?}"),
    }
}
