//! Drafts under construction
//!
//! A draft is the mutable target of an editing conversation: a point of
//! interest, a map note, or an uploaded GPS trace awaiting metadata.

use crate::geo::GeoPoint;
use crate::osm::ElementId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Description used when the user skips the description prompt
pub const DEFAULT_DESCRIPTION: &str = "no Description";

/// GPS trace visibility, in the order the toggle walks backwards through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Identifiable,
    #[default]
    Trackable,
    Public,
    Private,
}

impl Visibility {
    pub const ALL: [Visibility; 4] = [
        Visibility::Identifiable,
        Visibility::Trackable,
        Visibility::Public,
        Visibility::Private,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Identifiable => "identifiable",
            Visibility::Trackable => "trackable",
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    /// Step to the previous entry of [`Visibility::ALL`], wrapping
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Visibility::Identifiable => Visibility::Private,
            Visibility::Trackable => Visibility::Identifiable,
            Visibility::Public => Visibility::Trackable,
            Visibility::Private => Visibility::Public,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a [`DraftElement`] becomes when committed
#[derive(Debug, Clone, PartialEq)]
pub enum DraftKind {
    Node { location: GeoPoint },
    Note { location: GeoPoint, text: Option<String> },
}

/// Point of interest or note being built tag by tag
#[derive(Debug, Clone, PartialEq)]
pub struct DraftElement {
    /// Set once committed
    pub id: Option<ElementId>,
    pub kind: DraftKind,
    pub tags: BTreeMap<String, String>,
}

impl DraftElement {
    pub fn node(location: GeoPoint) -> Self {
        Self {
            id: None,
            kind: DraftKind::Node { location },
            tags: BTreeMap::new(),
        }
    }

    pub fn note(location: GeoPoint) -> Self {
        Self {
            id: None,
            kind: DraftKind::Note {
                location,
                text: None,
            },
            tags: BTreeMap::new(),
        }
    }

    pub fn location(&self) -> GeoPoint {
        match &self.kind {
            DraftKind::Node { location } | DraftKind::Note { location, .. } => *location,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, DraftKind::Note { .. })
    }

    /// Whether the draft carries enough to be committed
    pub fn is_complete(&self) -> bool {
        match &self.kind {
            DraftKind::Node { .. } => !self.tags.is_empty(),
            DraftKind::Note { text, .. } => text.as_deref().is_some_and(|t| !t.trim().is_empty()),
        }
    }

    /// Later values for the same key replace earlier ones
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Set the note body; no-op for nodes
    pub fn set_text(&mut self, body: impl Into<String>) {
        if let DraftKind::Note { text, .. } = &mut self.kind {
            *text = Some(body.into());
        }
    }
}

impl fmt::Display for DraftElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DraftKind::Node { location } => write!(f, "node at: {location}")?,
            DraftKind::Note { location, text } => {
                write!(f, "note at: {location}")?;
                if let Some(text) = text {
                    write!(f, "\n{text}")?;
                }
            }
        }
        if let Some(id) = self.id {
            write!(f, "\nid: {id}")?;
        }
        if !self.tags.is_empty() {
            f.write_str("\n ---- ")?;
            for (k, v) in &self.tags {
                write!(f, "\n{k}: {v}")?;
            }
        }
        Ok(())
    }
}

/// GPS trace waiting for its upload metadata
#[derive(Debug, Clone, PartialEq)]
pub struct DraftTrace {
    pub data: Vec<u8>,
    /// Original file name of the uploaded document
    pub file_name: String,
    pub name: Option<String>,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub visibility: Visibility,
}

impl DraftTrace {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            data,
            file_name: file_name.into(),
            name: None,
            description: DEFAULT_DESCRIPTION.to_string(),
            tags: BTreeSet::new(),
            visibility: Visibility::default(),
        }
    }

    /// Name sent with the upload; falls back to the document's file name
    pub fn upload_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.file_name)
    }

    /// Replace tags from a comma-separated list
    pub fn set_tags_from_text(&mut self, text: &str) {
        self.tags = parse_tag_list(text);
    }

    pub fn toggle_visibility(&mut self) {
        self.visibility = self.visibility.toggled();
    }
}

impl fmt::Display for DraftTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trace: {}", self.upload_name())?;
        writeln!(f, "description: {}", self.description)?;
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        writeln!(f, "tags: {}", tags.join(", "))?;
        write!(f, "visibility: {}", self.visibility)
    }
}

/// Split on commas, trim, drop empties
pub fn parse_tag_list(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Any draft a session can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Element(DraftElement),
    Trace(DraftTrace),
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Draft::Element(element) => element.fmt(f),
            Draft::Trace(trace) => trace.fmt(f),
        }
    }
}
