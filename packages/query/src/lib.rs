#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hot-spot query sources.
//!
//! Each source implements [`HotSpotSource`] and answers a [`HotSpotQuery`]
//! with raw hot-spots. [`ContractClient`] asks the contract over HTTP,
//! [`FileSource`] replays a saved answer, and [`AggregatedSource`] ranks a
//! location history export locally.

pub mod config;
pub mod contract;
pub mod file;
pub mod retry;

use async_trait::async_trait;
use hotspot_map_hotspot::HotSpotError;
use hotspot_map_hotspot::ranking::DEFAULT_QUERY_ACCURACY;
use hotspot_map_hotspot_models::{HotSpotResponse, RawHotSpot};
use serde::Deserialize;

pub use config::SourceConfig;
pub use contract::ContractClient;
pub use file::{AggregatedSource, FileSource};

/// Errors that can occur while querying hot-spots.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config parsing failed.
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The endpoint answered with an unusable status or body.
    #[error("Query failed: {message}")]
    Status {
        /// Description of what went wrong.
        message: String,
    },

    /// Source configuration is missing or inconsistent.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Hot-spot processing failed.
    #[error("Hot-spot error: {0}")]
    HotSpot(#[from] HotSpotError),
}

/// Parameters of a hot-spot query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotSpotQuery {
    /// Geohash prefix length cells are grouped by.
    pub accuracy: u32,
    /// Maximum number of cells to return; source default when unset.
    pub zones: Option<u32>,
}

impl Default for HotSpotQuery {
    fn default() -> Self {
        Self {
            accuracy: DEFAULT_QUERY_ACCURACY,
            zones: None,
        }
    }
}

/// Anything that can answer a hot-spot query.
#[async_trait]
pub trait HotSpotSource: Send + Sync {
    /// Returns a short identifier for log messages (e.g. `"contract"`).
    fn id(&self) -> &str;

    /// Fetches the hot-spots for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the source cannot be read or its answer
    /// cannot be parsed.
    async fn hot_spots(&self, query: &HotSpotQuery) -> Result<Vec<RawHotSpot>, QueryError>;
}

/// The shapes a hot-spot answer is accepted in.
#[derive(Deserialize)]
#[serde(untagged)]
enum HotSpotAnswer {
    Envelope(HotSpotResponse),
    Bare(Vec<RawHotSpot>),
}

/// Parses a hot-spot answer, either the contract envelope or a bare array.
///
/// # Errors
///
/// Returns [`QueryError::Json`] if the value matches neither shape.
pub fn parse_hot_spots(value: serde_json::Value) -> Result<Vec<RawHotSpot>, QueryError> {
    Ok(match serde_json::from_value::<HotSpotAnswer>(value)? {
        HotSpotAnswer::Envelope(response) => response.into_hot_spots(),
        HotSpotAnswer::Bare(hot_spots) => hot_spots,
    })
}
