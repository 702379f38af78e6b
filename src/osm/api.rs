//! OpenStreetMap API 0.6 client

use super::types::{Element, ElementId, ElementKind, NoteId, RawElement, TraceId};
use super::xml;
use super::OsmError;
use crate::draft::Visibility;
use crate::geo::GeoPoint;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Test instance used when no endpoint is configured
pub const DEFAULT_OSM_URL: &str = "https://master.apis.dev.openstreetmap.org";

/// Map-editing API client
#[derive(Clone)]
pub struct OsmApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// GPX upload parameters
#[derive(Debug, Clone)]
pub struct TraceUpload<'a> {
    pub data: &'a [u8],
    pub file_name: &'a str,
    pub description: &'a str,
    pub tags: Vec<&'a str>,
    pub visibility: Visibility,
}

#[derive(Debug, Deserialize)]
struct ElementsEnvelope {
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct NoteFeature {
    properties: NoteProperties,
}

#[derive(Debug, Deserialize)]
struct NoteProperties {
    id: NoteId,
}

impl OsmApi {
    /// Build a client for `base_url` (without the `/api/0.6` suffix).
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OsmError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("osmate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OsmError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/0.6{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, OsmError> {
        match &self.token {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(OsmError::auth("No OSM credentials configured")),
        }
    }

    /// Open a changeset and return its id
    pub async fn create_changeset(
        &self,
        tags: &BTreeMap<String, String>,
    ) -> Result<u64, OsmError> {
        let body = xml::changeset_document(tags)?;
        let request = self
            .client
            .put(self.url("/changeset/create"))
            .header("Content-Type", "text/xml")
            .body(body);
        let text = send_text(self.authorized(request)?).await?;
        parse_id(&text)
    }

    pub async fn close_changeset(&self, changeset: u64) -> Result<(), OsmError> {
        let request = self
            .client
            .put(self.url(&format!("/changeset/{changeset}/close")));
        send_text(self.authorized(request)?).await?;
        Ok(())
    }

    /// Create a node inside an open changeset
    pub async fn create_node(
        &self,
        changeset: u64,
        location: GeoPoint,
        tags: &BTreeMap<String, String>,
    ) -> Result<ElementId, OsmError> {
        let body = xml::node_document(changeset, location, tags)?;
        let request = self
            .client
            .put(self.url("/node/create"))
            .header("Content-Type", "text/xml")
            .body(body);
        let text = send_text(self.authorized(request)?).await?;
        parse_id(&text)
    }

    /// Open a map note
    pub async fn create_note(&self, location: GeoPoint, text: &str) -> Result<NoteId, OsmError> {
        let request = self.client.post(self.url("/notes.json")).query(&[
            ("lat", location.lat.to_string()),
            ("lon", location.lon.to_string()),
            ("text", text.to_string()),
        ]);
        let response = check(self.authorized(request)?.send().await?).await?;
        let feature: NoteFeature = response.json().await?;
        Ok(feature.properties.id)
    }

    /// Upload a GPX file
    pub async fn upload_trace(&self, upload: TraceUpload<'_>) -> Result<TraceId, OsmError> {
        let file = Part::bytes(upload.data.to_vec()).file_name(upload.file_name.to_string());
        let form = Form::new()
            .part("file", file)
            .text("description", upload.description.to_string())
            .text("tags", upload.tags.join(","))
            .text("visibility", upload.visibility.as_str());
        let request = self.client.post(self.url("/gpx/create")).multipart(form);
        let text = send_text(self.authorized(request)?).await?;
        parse_id(&text)
    }

    /// Read a single element
    pub async fn get_element(&self, kind: ElementKind, id: ElementId) -> Result<Element, OsmError> {
        let request = self.client.get(self.url(&format!("/{kind}/{id}.json")));
        let response = check(request.send().await?).await?;
        let envelope: ElementsEnvelope = response.json().await?;
        let raw = envelope
            .elements
            .into_iter()
            .next()
            .ok_or_else(|| OsmError::invalid_response(format!("{kind} {id} missing from response")))?;
        Element::try_from(raw).map_err(OsmError::invalid_response)
    }
}

async fn check(response: Response) -> Result<Response, OsmError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(OsmError::from_status(status, &body))
    }
}

async fn send_text(request: RequestBuilder) -> Result<String, OsmError> {
    let response = check(request.send().await?).await?;
    Ok(response.text().await?)
}

fn parse_id<T: std::str::FromStr>(text: &str) -> Result<T, OsmError> {
    text.trim()
        .parse()
        .map_err(|_| OsmError::invalid_response(format!("Expected an id, got {text:?}")))
}
