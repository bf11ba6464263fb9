//! In-memory hot-spot ranking.
//!
//! [`HotspotMap`] counts observed locations by full-precision geohash and
//! ranks cells at query time by summing every location that shares a
//! prefix of the requested length. This is the producer side of the
//! hot-spot query: the same ranking the contract answers with.

use std::collections::BTreeMap;

use hotspot_map_geohash::{GeohashError, decode_cell, encode};
use hotspot_map_hotspot_models::{LatLng, RawHotSpot};

/// Geohash precision locations are stored at (about 5 m x 5 m).
pub const DEFAULT_RECORD_PRECISION: usize = 9;

/// Prefix length cells are grouped by when none is requested (about
/// 150 m x 150 m).
pub const DEFAULT_ACCURACY: usize = DEFAULT_QUERY_ACCURACY as usize;

/// [`DEFAULT_ACCURACY`] as carried in query messages.
pub const DEFAULT_QUERY_ACCURACY: u32 = 7;

/// Number of cells returned when none is requested.
pub const DEFAULT_ZONES: usize = 10;

/// Observation counts keyed by geohash.
#[derive(Debug, Clone)]
pub struct HotspotMap {
    precision: usize,
    locations: BTreeMap<String, u32>,
}

impl Default for HotspotMap {
    fn default() -> Self {
        Self::new()
    }
}

impl HotspotMap {
    /// Creates an empty map recording at [`DEFAULT_RECORD_PRECISION`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            precision: DEFAULT_RECORD_PRECISION,
            locations: BTreeMap::new(),
        }
    }

    /// Creates an empty map recording positions at `precision`.
    ///
    /// # Errors
    ///
    /// Returns [`GeohashError::InvalidPrecision`] if `precision` is not a
    /// valid geohash length.
    pub fn with_precision(precision: usize) -> Result<Self, GeohashError> {
        if !(1..=hotspot_map_geohash::MAX_PRECISION).contains(&precision) {
            return Err(GeohashError::InvalidPrecision { precision });
        }
        Ok(Self {
            precision,
            locations: BTreeMap::new(),
        })
    }

    /// Encodes `position` and counts one observation for its cell.
    /// Returns the geohash it was counted under.
    ///
    /// # Errors
    ///
    /// Returns [`GeohashError::CoordinateOutOfRange`] for invalid coordinates.
    pub fn record(&mut self, position: LatLng) -> Result<String, GeohashError> {
        let hash = encode(position, self.precision)?;
        *self.locations.entry(hash.clone()).or_insert(0) += 1;
        Ok(hash)
    }

    /// Counts one observation for an already-encoded geohash.
    ///
    /// # Errors
    ///
    /// Returns [`GeohashError`] if `hash` is not a valid geohash.
    pub fn insert(&mut self, hash: &str) -> Result<u32, GeohashError> {
        decode_cell(hash)?;
        let count = self.locations.entry(hash.to_ascii_lowercase()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    /// Removes one observation for `hash`. The key is dropped once its
    /// count reaches zero. Returns `false` if `hash` was never counted.
    pub fn remove(&mut self, hash: &str) -> bool {
        let key = hash.to_ascii_lowercase();
        let Some(count) = self.locations.get_mut(&key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.locations.remove(&key);
        }
        true
    }

    /// Observation count for an exact geohash.
    #[must_use]
    pub fn count(&self, hash: &str) -> u32 {
        self.locations
            .get(&hash.to_ascii_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Number of distinct geohashes counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Returns the `zones` strongest cells at prefix length `accuracy`,
    /// sorted by power descending (ties by geohash).
    ///
    /// Geohashes shorter than `accuracy` are too coarse to attribute to a
    /// single cell and are skipped.
    #[must_use]
    pub fn top_hot_spots(&self, accuracy: usize, zones: usize) -> Vec<RawHotSpot> {
        let mut cells: BTreeMap<&str, u64> = BTreeMap::new();
        for (hash, &count) in &self.locations {
            let Some(prefix) = hash.get(..accuracy) else {
                continue;
            };
            *cells.entry(prefix).or_insert(0) += u64::from(count);
        }

        let mut ranked: Vec<(&str, u64)> = cells.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(zones);

        log::debug!(
            "Ranked {} cells at accuracy {accuracy} from {} locations",
            ranked.len(),
            self.locations.len()
        );

        ranked
            .into_iter()
            .map(|(hash, power)| {
                #[allow(clippy::cast_precision_loss)]
                let power = power as f64;
                RawHotSpot::new(hash, power)
            })
            .collect()
    }
}
