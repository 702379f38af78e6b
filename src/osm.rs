//! OpenStreetMap editing API
//!
//! Client for the API 0.6 endpoints the bot writes to (changesets, nodes,
//! notes, GPX traces) plus element reads.

mod api;
mod error;
mod types;
mod xml;

pub use api::{OsmApi, TraceUpload, DEFAULT_OSM_URL};
pub use error::{OsmError, OsmErrorKind};
pub use types::{
    Element, ElementHeader, ElementId, ElementKind, Member, MicroElement, NoteId, TraceId,
};
