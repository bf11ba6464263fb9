#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hot-spot processing pipeline.
//!
//! Raw hot-spots from the query are decoded ([`decode_all`]), normalized
//! against the batch and bucketed ([`classify::classify`]), then turned into
//! render-ready [`Marker`]s ([`build_markers`]). The [`ranking`] module
//! produces hot-spots from raw location observations, and [`window`]
//! limits them to the last two weeks.

pub mod classify;
pub mod ranking;
pub mod window;

use hotspot_map_geohash::GeohashError;
use hotspot_map_hotspot_models::{ClassifiedSample, DecodedSample, Marker, RawHotSpot};

pub use classify::{PowerRange, bucket_for, classify};
pub use ranking::HotspotMap;
pub use window::TimedHotspotMap;

/// Errors that can occur while processing hot-spots.
#[derive(Debug, thiserror::Error)]
pub enum HotSpotError {
    /// The hot-spot's geohash could not be decoded.
    #[error("Invalid geohash: {0}")]
    InvalidGeohash(#[from] GeohashError),

    /// The hot-spot's power is NaN or infinite.
    #[error("Non-finite power {power} for {geo_location:?}")]
    NonFinitePower {
        /// Geohash of the offending hot-spot.
        geo_location: String,
        /// The offending power value.
        power: f64,
    },

    /// Classification was asked to normalize an empty batch.
    #[error("Cannot classify an empty batch")]
    EmptyBatch,
}

/// Circle styling applied to every marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub radius_meters: f64,
    pub fill_opacity: f64,
    pub filled: bool,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius_meters: 305.0,
            fill_opacity: 0.2,
            filled: true,
        }
    }
}

/// A hot-spot dropped from the batch, with the reason.
#[derive(Debug)]
pub struct RejectedHotSpot {
    pub hot_spot: RawHotSpot,
    pub error: HotSpotError,
}

/// Result of decoding a batch: the usable samples, in input order, and
/// the hot-spots that had to be dropped.
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    pub samples: Vec<DecodedSample>,
    pub rejected: Vec<RejectedHotSpot>,
}

/// Markers ready for the renderer plus whatever was dropped on the way.
#[derive(Debug, Default)]
pub struct MarkerBatch {
    pub markers: Vec<Marker>,
    pub rejected: Vec<RejectedHotSpot>,
}

/// Decodes a single hot-spot.
///
/// # Errors
///
/// Returns [`HotSpotError::InvalidGeohash`] for a malformed geohash and
/// [`HotSpotError::NonFinitePower`] if the power is NaN or infinite.
pub fn decode_hot_spot(hot_spot: &RawHotSpot) -> Result<DecodedSample, HotSpotError> {
    if !hot_spot.power.is_finite() {
        return Err(HotSpotError::NonFinitePower {
            geo_location: hot_spot.geo_location.clone(),
            power: hot_spot.power,
        });
    }
    let position = hotspot_map_geohash::decode(&hot_spot.geo_location)?;
    Ok(DecodedSample::new(position, hot_spot.power))
}

/// Decodes a batch, dropping hot-spots that fail to decode.
///
/// Dropped hot-spots never reach normalization, so they cannot skew the
/// batch extrema.
#[must_use]
pub fn decode_all(hot_spots: &[RawHotSpot]) -> DecodeOutcome {
    let mut outcome = DecodeOutcome::default();
    for hot_spot in hot_spots {
        match decode_hot_spot(hot_spot) {
            Ok(sample) => outcome.samples.push(sample),
            Err(error) => {
                log::warn!("Dropping hot-spot {:?}: {error}", hot_spot.geo_location);
                outcome.rejected.push(RejectedHotSpot {
                    hot_spot: hot_spot.clone(),
                    error,
                });
            }
        }
    }
    outcome
}

/// Converts a classified sample into a drawable marker.
#[must_use]
pub fn to_marker(sample: &ClassifiedSample, style: &MarkerStyle) -> Marker {
    Marker {
        latitude: sample.latitude,
        longitude: sample.longitude,
        color: sample.color_bucket.hex().to_string(),
        filled: style.filled,
        radius_meters: style.radius_meters,
        fill_opacity: style.fill_opacity,
        intensity: sample.normalized_intensity,
    }
}

/// Runs the full pipeline: decode, classify, and style.
///
/// A batch with nothing decodable yields no markers; classification is
/// never attempted on it.
///
/// # Errors
///
/// Returns [`HotSpotError`] if classification fails.
pub fn build_markers(
    hot_spots: &[RawHotSpot],
    style: &MarkerStyle,
) -> Result<MarkerBatch, HotSpotError> {
    let DecodeOutcome { samples, rejected } = decode_all(hot_spots);

    if samples.is_empty() {
        log::info!(
            "No drawable hot-spots ({} received, {} rejected)",
            hot_spots.len(),
            rejected.len()
        );
        return Ok(MarkerBatch {
            markers: Vec::new(),
            rejected,
        });
    }

    let markers = classify(&samples)?
        .iter()
        .map(|sample| to_marker(sample, style))
        .collect();

    Ok(MarkerBatch { markers, rejected })
}
