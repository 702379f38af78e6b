//! OSM primitive types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a committed node, way or relation
pub type ElementId = i64;

/// Kind of an OSM primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" | "nodes" => Ok(ElementKind::Node),
            "way" | "ways" => Ok(ElementKind::Way),
            "relation" | "relations" | "rel" => Ok(ElementKind::Relation),
            other => Err(format!("unknown element kind: {other}")),
        }
    }
}

/// Weak reference to an OSM primitive, as attached to an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroElement {
    pub id: ElementId,
    pub kind: ElementKind,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl MicroElement {
    pub fn new(id: ElementId, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }
}

impl fmt::Display for MicroElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.id)
    }
}

/// Metadata shared by every committed element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementHeader {
    pub id: ElementId,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub changeset: Option<u64>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub uid: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_visible() -> bool {
    true
}

/// Relation member reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(rename = "ref")]
    pub id: ElementId,
    #[serde(default)]
    pub role: String,
}

/// A committed element as read back from the map API
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node {
        header: ElementHeader,
        lat: f64,
        lon: f64,
    },
    Way {
        header: ElementHeader,
        nodes: Vec<ElementId>,
    },
    Relation {
        header: ElementHeader,
        members: Vec<Member>,
    },
}

/// Flat wire shape of an element in the API 0.6 JSON format
#[derive(Debug, Deserialize)]
pub(crate) struct RawElement {
    #[serde(rename = "type")]
    kind: ElementKind,
    #[serde(flatten)]
    header: ElementHeader,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    nodes: Vec<ElementId>,
    #[serde(default)]
    members: Vec<Member>,
}

impl TryFrom<RawElement> for Element {
    type Error = String;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        match raw.kind {
            ElementKind::Node => match (raw.lat, raw.lon) {
                (Some(lat), Some(lon)) => Ok(Element::Node {
                    header: raw.header,
                    lat,
                    lon,
                }),
                _ => Err(format!("node {} has no coordinates", raw.header.id)),
            },
            ElementKind::Way => Ok(Element::Way {
                header: raw.header,
                nodes: raw.nodes,
            }),
            ElementKind::Relation => Ok(Element::Relation {
                header: raw.header,
                members: raw.members,
            }),
        }
    }
}

impl Element {
    pub fn header(&self) -> &ElementHeader {
        match self {
            Element::Node { header, .. }
            | Element::Way { header, .. }
            | Element::Relation { header, .. } => header,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Node { .. } => ElementKind::Node,
            Element::Way { .. } => ElementKind::Way,
            Element::Relation { .. } => ElementKind::Relation,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        writeln!(f, "{} {}", self.kind(), header.id)?;
        if let Some(timestamp) = header.timestamp {
            writeln!(f, "created: {}", timestamp.to_rfc3339())?;
        }
        if let Some(version) = header.version {
            writeln!(f, "version: {version}")?;
        }
        writeln!(f, "visible: {}", header.visible)?;
        if let Some(changeset) = header.changeset {
            writeln!(f, "changeset: {changeset}")?;
        }
        if let Some(user) = &header.user {
            writeln!(f, "{user} {}", header.uid.unwrap_or_default())?;
        }
        writeln!(f, " ---- ")?;
        for (k, v) in &header.tags {
            writeln!(f, "{k}: {v}")?;
        }
        match self {
            Element::Node { lat, lon, .. } => write!(f, "loc: {lat}, {lon}"),
            Element::Way { nodes, .. } => write!(f, "node_count: {}", nodes.len()),
            Element::Relation { members, .. } => write!(f, "member_count: {}", members.len()),
        }
    }
}

/// Identifier of an uploaded GPS trace
pub type TraceId = u64;

/// Identifier of a map note
pub type NoteId = u64;
