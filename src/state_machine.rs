//! Per-user editing state machine
//!
//! Pure transitions over an [`EditSession`]; side effects are returned as
//! data for the runtime to execute.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Button, Effect, IssueQuery, RenderRequest};
pub use event::{Action, Command, Event};
pub use state::{EditSession, EditState, SessionContext};
pub use transition::{transition, TransitionError, TransitionResult};
