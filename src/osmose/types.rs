//! Issue model and Osmose wire formats

use crate::geo::{BoundingBox, GeoPoint};
use crate::osm::{ElementId, ElementKind, MicroElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A data-quality issue reported by Osmose
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub id: String,
    pub location: GeoPoint,
    pub title: String,
    pub subtitle: String,
    pub elements: Vec<MicroElement>,
    /// Zero until the issue is fetched through the detail endpoint
    pub bbox: BoundingBox,
}

impl Issue {
    /// Link to the issue location on osm.org
    pub fn osm_url(&self) -> String {
        self.location.osm_url()
    }

    /// Link to the Osmose description page
    pub fn desc_url(&self) -> String {
        format!("http://osmose.openstreetmap.fr/en/error/{}", self.id)
    }

    /// Multi-line description used for the detail view
    pub fn detail(&self) -> String {
        let mut out = format!("{}\n", self.title);
        if !self.subtitle.is_empty() {
            out.push_str(&self.subtitle);
            out.push('\n');
        }
        out.push_str(&format!("at: {}\n", self.location));
        for element in &self.elements {
            out.push_str(&format!("\n{element}"));
            for (k, v) in &element.tags {
                out.push_str(&format!("\n  {k}: {v}"));
            }
        }
        out.push_str(&format!("\n\n{}\n{}", self.osm_url(), self.desc_url()));
        out
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elems: Vec<String> = self.elements.iter().map(ToString::to_string).collect();
        write!(
            f,
            "\"{}\" Issue at: ({}) , elems: [{}]",
            self.title,
            self.location,
            elems.join(", ")
        )
    }
}

/// Text that Osmose sends either plain or as a `{"auto": ...}` translation map
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Localized {
    Plain(String),
    Translated {
        #[serde(default)]
        auto: Option<String>,
    },
}

impl Localized {
    fn into_text(self) -> String {
        match self {
            Localized::Plain(text) => text,
            Localized::Translated { auto } => auto.unwrap_or_default(),
        }
    }
}

fn text_of(value: Option<Localized>) -> String {
    value.map(Localized::into_text).unwrap_or_default()
}

/// Coordinate that Osmose sends as either a number or a string
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum Coordinate {
    Number(f64),
    Text(#[serde(deserialize_with = "parse_float")] f64),
}

impl Coordinate {
    fn value(self) -> f64 {
        match self {
            Coordinate::Number(v) | Coordinate::Text(v) => v,
        }
    }
}

fn parse_float<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    text.trim().parse().map_err(serde::de::Error::custom)
}

/// `GET /issues` response
#[derive(Debug, Deserialize)]
pub(crate) struct IssueList {
    #[serde(default)]
    pub issues: Vec<ApiIssue>,
}

/// One entry of the issue list
#[derive(Debug, Deserialize)]
pub(crate) struct ApiIssue {
    pub id: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    #[serde(default)]
    pub title: Option<Localized>,
    #[serde(default)]
    pub subtitle: Option<Localized>,
    #[serde(default)]
    pub osm_ids: BTreeMap<String, Vec<ElementId>>,
}

impl From<ApiIssue> for Issue {
    fn from(api: ApiIssue) -> Self {
        let elements = api
            .osm_ids
            .into_iter()
            .filter_map(|(key, ids)| key.parse::<ElementKind>().ok().map(|kind| (kind, ids)))
            .flat_map(|(kind, ids)| ids.into_iter().map(move |id| MicroElement::new(id, kind)))
            .collect();

        Issue {
            id: api.id,
            location: GeoPoint::new(api.lat.value(), api.lon.value()),
            title: text_of(api.title),
            subtitle: text_of(api.subtitle),
            elements,
            bbox: BoundingBox::default(),
        }
    }
}

/// `GET /issue/{id}` response
#[derive(Debug, Deserialize)]
pub(crate) struct IssueDetail {
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub minlat: Coordinate,
    pub maxlat: Coordinate,
    pub minlon: Coordinate,
    pub maxlon: Coordinate,
    #[serde(default)]
    pub title: Option<Localized>,
    #[serde(default)]
    pub subtitle: Option<Localized>,
    #[serde(default)]
    pub elems: Vec<DetailElement>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: ElementId,
    #[serde(default)]
    pub tags: Vec<DetailTag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailTag {
    pub k: String,
    pub v: String,
}

impl IssueDetail {
    pub(crate) fn into_issue(self, id: &str) -> Issue {
        let elements = self
            .elems
            .into_iter()
            .filter_map(|elem| {
                let kind = elem.kind.parse::<ElementKind>().ok()?;
                let tags = elem.tags.into_iter().map(|t| (t.k, t.v)).collect();
                Some(MicroElement::new(elem.id, kind).with_tags(tags))
            })
            .collect();

        Issue {
            id: id.to_string(),
            location: GeoPoint::new(self.lat.value(), self.lon.value()),
            title: text_of(self.title),
            subtitle: text_of(self.subtitle),
            elements,
            bbox: BoundingBox::new(
                self.minlon.value(),
                self.minlat.value(),
                self.maxlon.value(),
                self.maxlat.value(),
            ),
        }
    }
}
