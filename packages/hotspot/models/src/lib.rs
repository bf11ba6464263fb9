#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hot-spot sample types shared across the hotspot-map workspace.
//!
//! A hot-spot travels through three shapes: the [`RawHotSpot`] returned by
//! the contract query, the [`DecodedSample`] produced once its geohash is
//! decoded, and the [`ClassifiedSample`] carrying a normalized intensity and
//! a [`ColorBucket`]. [`Marker`] is the render-ready form handed to the map.

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A hot-spot record as returned by the contract query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHotSpot {
    /// Geohash of the cell this reading belongs to (e.g. `"sv8wrxf"`).
    pub geo_location: String,
    /// Signal power (observation count) for the cell.
    pub power: f64,
}

impl RawHotSpot {
    /// Creates a new raw hot-spot.
    #[must_use]
    pub fn new(geo_location: impl Into<String>, power: f64) -> Self {
        Self {
            geo_location: geo_location.into(),
            power,
        }
    }
}

/// Query message sent to the contract.
///
/// Serializes to `{"hot_spot": {"accuracy": 7}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotSpotQueryMsg {
    /// Ask for the strongest cells at a given geohash precision.
    HotSpot {
        /// Geohash prefix length the contract groups by.
        accuracy: u32,
        /// Number of cells to return. The contract default applies when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zones: Option<u32>,
    },
}

/// Envelope the contract wraps its hot-spot answer in.
///
/// Deserializes from `{"hot_spot_response": {"hot_spots": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotSpotResponse {
    /// The ranked hot-spots.
    HotSpotResponse {
        /// Hot-spots, typically ordered by descending power.
        hot_spots: Vec<RawHotSpot>,
    },
}

impl HotSpotResponse {
    /// Consumes the envelope and returns the hot-spots.
    #[must_use]
    pub fn into_hot_spots(self) -> Vec<RawHotSpot> {
        match self {
            Self::HotSpotResponse { hot_spots } => hot_spots,
        }
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, `-90..=90`.
    pub latitude: f64,
    /// Longitude in degrees, `-180..=180`.
    pub longitude: f64,
}

impl LatLng {
    /// Creates a new position.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A hot-spot with its geohash decoded to the center of its cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedSample {
    /// Cell center latitude.
    pub latitude: f64,
    /// Cell center longitude.
    pub longitude: f64,
    /// Power as reported by the query, before normalization.
    pub raw_power: f64,
}

impl DecodedSample {
    /// Builds a sample from a decoded position and its raw power.
    #[must_use]
    pub const fn new(position: LatLng, raw_power: f64) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            raw_power,
        }
    }

    #[must_use]
    pub const fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// A sample with its power rescaled against the batch and bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedSample {
    /// Cell center latitude.
    pub latitude: f64,
    /// Cell center longitude.
    pub longitude: f64,
    /// Power rescaled to `0.0..=1.0` relative to the batch extrema.
    pub normalized_intensity: f64,
    /// Discrete color category for the intensity.
    pub color_bucket: ColorBucket,
}

/// Discrete color categories, hottest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorBucket {
    /// Intensity above 0.9
    Red,
    /// Intensity in (0.7, 0.9]
    Orange,
    /// Intensity in (0.5, 0.7]
    Amber,
    /// Intensity in (0.3, 0.5]
    Yellow,
    /// Intensity in (0.1, 0.3]
    YellowGreen,
    /// Intensity at or below 0.1
    Green,
}

impl ColorBucket {
    /// Returns the CSS color string drawn for this bucket.
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Red => "#ff0000",
            Self::Orange => "#f45004",
            Self::Amber => "#f79c01",
            Self::Yellow => "#fff300",
            Self::YellowGreen => "#d3ff1e",
            Self::Green => "#00FF00",
        }
    }

    /// Returns all variants of this enum, hottest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Red,
            Self::Orange,
            Self::Amber,
            Self::Yellow,
            Self::YellowGreen,
            Self::Green,
        ]
    }
}

/// A drawable circle handed to the map renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Circle center latitude.
    pub latitude: f64,
    /// Circle center longitude.
    pub longitude: f64,
    /// Stroke and fill color (`#rrggbb`).
    pub color: String,
    /// Whether the circle is filled.
    pub filled: bool,
    /// Circle radius in meters.
    pub radius_meters: f64,
    /// Fill opacity, `0.0..=1.0`.
    pub fill_opacity: f64,
    /// Normalized intensity the color was derived from.
    pub intensity: f64,
}

/// Initial camera position for the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    /// Map center.
    pub center: LatLng,
    /// Zoom level.
    pub zoom: u8,
}

impl Default for MapView {
    /// Berlin at city-level zoom.
    fn default() -> Self {
        Self {
            center: LatLng::new(52.5200, 13.4050),
            zoom: 11,
        }
    }
}

/// One point of a location history export.
///
/// Matches the Google Takeout shape, where coordinates are stored as
/// integers scaled by 1e7 and the timestamp may be a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    /// Latitude multiplied by 1e7.
    #[serde(rename = "latitudeE7")]
    pub latitude_e7: i64,
    /// Longitude multiplied by 1e7.
    #[serde(rename = "longitudeE7")]
    pub longitude_e7: i64,
    /// Milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "deserialize_timestamp_ms")]
    pub timestamp_ms: Option<u64>,
}

impl LocationRecord {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_lat_lng(&self) -> LatLng {
        LatLng::new(
            self.latitude_e7 as f64 / 1e7,
            self.longitude_e7 as f64 / 1e7,
        )
    }
}

fn deserialize_timestamp_ms<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Number(u64),
        Text(String),
    }

    match Option::<Timestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Timestamp::Number(ms)) => Ok(Some(ms)),
        Some(Timestamp::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
