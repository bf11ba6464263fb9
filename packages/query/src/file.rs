//! Sources backed by local JSON files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hotspot_map_hotspot::{HotspotMap, TimedHotspotMap};
use hotspot_map_hotspot::ranking::DEFAULT_ZONES;
use hotspot_map_hotspot_models::{LocationRecord, RawHotSpot};
use serde::Deserialize;

use crate::{HotSpotQuery, HotSpotSource, QueryError, parse_hot_spots};

/// Replays a saved hot-spot answer.
///
/// The file holds either the contract envelope or a bare array of
/// hot-spots. The answer was ranked when it was saved, so `accuracy` is
/// ignored; `zones` still truncates.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HotSpotSource for FileSource {
    fn id(&self) -> &str {
        "file"
    }

    async fn hot_spots(&self, query: &HotSpotQuery) -> Result<Vec<RawHotSpot>, QueryError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let mut hot_spots = parse_hot_spots(serde_json::from_str(&text)?)?;
        if let Some(zones) = query.zones {
            hot_spots.truncate(zones as usize);
        }
        log::debug!(
            "Read {} hot-spots from {}",
            hot_spots.len(),
            self.path.display()
        );
        Ok(hot_spots)
    }
}

/// Location history file shapes: a bare array or a takeout-style object.
#[derive(Deserialize)]
#[serde(untagged)]
enum LocationHistory {
    Wrapped { locations: Vec<LocationRecord> },
    Bare(Vec<LocationRecord>),
}

/// Ranks a location history export locally, over the two weeks ending
/// at its newest record.
pub struct AggregatedSource {
    window: TimedHotspotMap,
}

impl AggregatedSource {
    #[must_use]
    pub const fn from_window(window: TimedHotspotMap) -> Self {
        Self { window }
    }

    /// Reads a location history file and counts every record inside the
    /// window. Records without a timestamp, outside the window, or with
    /// out-of-range coordinates are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, QueryError> {
        let text = tokio::fs::read_to_string(path).await?;
        let records = match serde_json::from_str::<LocationHistory>(&text)? {
            LocationHistory::Wrapped { locations } => locations,
            LocationHistory::Bare(locations) => locations,
        };
        Ok(Self::from_window(aggregate(&records)))
    }

    #[must_use]
    pub const fn map(&self) -> &HotspotMap {
        self.window.map()
    }

    #[must_use]
    pub const fn window(&self) -> &TimedHotspotMap {
        &self.window
    }
}

/// Counts `records` into a window ending at the newest timestamp.
#[must_use]
pub fn aggregate(records: &[LocationRecord]) -> TimedHotspotMap {
    let newest = records.iter().filter_map(|r| r.timestamp_ms).max().unwrap_or(0);
    let mut window = TimedHotspotMap::ending_at(newest);

    let mut counted = 0usize;
    for record in records {
        let Some(time_ms) = record.timestamp_ms else {
            log::debug!("Skipping location record without timestamp");
            continue;
        };
        match window.record(record.to_lat_lng(), time_ms) {
            Ok(Some(_)) => counted += 1,
            Ok(None) => log::debug!("Skipping location record at {time_ms}: outside window"),
            Err(e) => log::debug!("Skipping location record: {e}"),
        }
    }

    let skipped = records.len() - counted;
    if skipped > 0 {
        log::warn!("Skipped {skipped} of {} location records", records.len());
    }
    let range = window.time_range();
    log::info!(
        "Aggregated {counted} location records into {} cells ({}..{})",
        window.map().len(),
        range.from_ms,
        range.to_ms
    );
    window
}

#[async_trait]
impl HotSpotSource for AggregatedSource {
    fn id(&self) -> &str {
        "aggregated"
    }

    async fn hot_spots(&self, query: &HotSpotQuery) -> Result<Vec<RawHotSpot>, QueryError> {
        let zones = query.zones.map_or(DEFAULT_ZONES, |z| z as usize);
        Ok(self.map().top_hot_spots(query.accuracy as usize, zones))
    }
}
