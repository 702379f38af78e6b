//! XML payloads for API 0.6 write calls
//!
//! Reads go through the JSON endpoints; creates still require an `<osm>`
//! document.

use super::OsmError;
use crate::geo::GeoPoint;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;

const GENERATOR: &str = "osmate";

/// `<osm><changeset>` body for `PUT /changeset/create`
pub fn changeset_document(tags: &BTreeMap<String, String>) -> Result<String, OsmError> {
    let mut writer = Writer::new(Vec::new());
    open(&mut writer, osm_root())?;
    open(&mut writer, BytesStart::new("changeset"))?;
    write_tags(&mut writer, tags)?;
    close(&mut writer, "changeset")?;
    close(&mut writer, "osm")?;
    finish(writer)
}

/// `<osm><node>` body for `PUT /node/create`
pub fn node_document(
    changeset: u64,
    location: GeoPoint,
    tags: &BTreeMap<String, String>,
) -> Result<String, OsmError> {
    let changeset = changeset.to_string();
    let lat = location.lat.to_string();
    let lon = location.lon.to_string();

    let mut writer = Writer::new(Vec::new());
    open(&mut writer, osm_root())?;
    let node = BytesStart::new("node").with_attributes([
        ("changeset", changeset.as_str()),
        ("lat", lat.as_str()),
        ("lon", lon.as_str()),
    ]);
    if tags.is_empty() {
        emit(&mut writer, Event::Empty(node))?;
    } else {
        open(&mut writer, node)?;
        write_tags(&mut writer, tags)?;
        close(&mut writer, "node")?;
    }
    close(&mut writer, "osm")?;
    finish(writer)
}

fn osm_root() -> BytesStart<'static> {
    BytesStart::new("osm").with_attributes([("version", "0.6"), ("generator", GENERATOR)])
}

fn write_tags(
    writer: &mut Writer<Vec<u8>>,
    tags: &BTreeMap<String, String>,
) -> Result<(), OsmError> {
    for (k, v) in tags {
        let tag = BytesStart::new("tag").with_attributes([("k", k.as_str()), ("v", v.as_str())]);
        emit(writer, Event::Empty(tag))?;
    }
    Ok(())
}

fn open(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>) -> Result<(), OsmError> {
    emit(writer, Event::Start(start))
}

fn close(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), OsmError> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), OsmError> {
    writer
        .write_event(event)
        .map_err(|e| OsmError::encode(format!("Failed to write XML: {e}")))
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, OsmError> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| OsmError::encode(format!("XML is not UTF-8: {e}")))
}
