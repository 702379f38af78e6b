//! Geographic primitives
//!
//! Points and the radius-to-bounding-box conversion used by the issue search.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Earth radius used by the spherical approximation, in meters
pub const EARTH_RADIUS_M: f64 = 6_378_000.0;

/// Decimal places kept on every bounding box edge
const BBOX_DECIMALS: i32 = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// A (latitude, longitude) pair in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a point, rejecting NaN and infinities
    pub fn checked(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(GeoError::InvalidGeometry(format!(
                "non-finite coordinate ({lat}, {lon})"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Link to this location on the osm.org map
    pub fn osm_url(&self) -> String {
        format!(
            "https://osm.org/#map=18/{}/{}&layers=ND",
            self.lat, self.lon
        )
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// Axis-aligned geographic rectangle, (minLon, minLat, maxLon, maxLat)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Midpoint of the box
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Comma-joined edges in the order search APIs expect
    pub fn to_query(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Compute the box spanning `radius_m` meters around `center`.
///
/// The longitude delta ignores latitude; the latitude delta is widened by
/// `1 / cos(lat)`. Edges are rounded to 8 decimal places.
///
/// # Errors
///
/// Returns [`GeoError::InvalidGeometry`] for non-finite inputs, a negative
/// radius, or a radius the spherical approximation cannot represent at
/// this latitude.
pub fn bounding_box(center: GeoPoint, radius_m: f64) -> Result<BoundingBox, GeoError> {
    let GeoPoint { lat, lon } = center;
    if !lat.is_finite() || !lon.is_finite() || !radius_m.is_finite() {
        return Err(GeoError::InvalidGeometry(format!(
            "non-finite input (lat {lat}, lon {lon}, radius {radius_m})"
        )));
    }
    if radius_m < 0.0 {
        return Err(GeoError::InvalidGeometry(format!(
            "negative radius {radius_m}"
        )));
    }

    let lat_ratio = radius_m / (EARTH_RADIUS_M * lat.to_radians().cos());
    let lon_ratio = radius_m / EARTH_RADIUS_M;
    if !(0.0..=1.0).contains(&lat_ratio) || lon_ratio > 1.0 {
        return Err(GeoError::InvalidGeometry(format!(
            "radius {radius_m}m out of range at latitude {lat}"
        )));
    }

    let lat_delta = lat_ratio.asin().to_degrees();
    let lon_delta = lon_ratio.asin().to_degrees();

    Ok(BoundingBox {
        min_lon: round_to(lon - lon_delta, BBOX_DECIMALS),
        min_lat: round_to(lat - lat_delta, BBOX_DECIMALS),
        max_lon: round_to(lon + lon_delta, BBOX_DECIMALS),
        max_lat: round_to(lat + lat_delta, BBOX_DECIMALS),
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
