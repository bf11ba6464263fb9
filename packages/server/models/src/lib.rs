#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the hotspot map server.
//!
//! These types are serialized to JSON for the REST API. They wrap the
//! pipeline types so the API contract can evolve independently.

use hotspot_map_hotspot_models::Marker;
use serde::{Deserialize, Serialize};

/// Response for the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Query parameters for the markers endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkersQueryParams {
    /// Geohash prefix length to group by (server default when unset).
    pub accuracy: Option<u32>,
    /// Maximum number of cells to draw.
    pub zones: Option<u32>,
}

/// A hot-spot that could not be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRejectedHotSpot {
    /// Geohash as received.
    pub geo_location: String,
    /// Why it was dropped.
    pub reason: String,
}

/// Response for the markers endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarkersResponse {
    /// Markers in the order the source ranked them.
    pub markers: Vec<Marker>,
    /// Number of hot-spots the source returned.
    pub received: usize,
    /// Hot-spots dropped before drawing.
    pub rejected: Vec<ApiRejectedHotSpot>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
