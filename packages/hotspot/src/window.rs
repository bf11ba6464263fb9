//! Time-windowed hot-spot counting.
//!
//! [`TimedHotspotMap`] keeps the last [`WINDOW_DAYS`] days of observations
//! in one [`DailyBucket`] per day. Observations count toward the ranking
//! only while their day is inside the window; [`TimedHotspotMap::new_day`]
//! drops the oldest day and uncounts everything it held.
//!
//! The buckets also answer exposure queries: whether anything was observed
//! in or next to a cell around a given time
//! ([`TimedHotspotMap::match_position`]).

use std::collections::{BTreeMap, VecDeque};

use hotspot_map_geohash::{GeohashError, neighbors};
use hotspot_map_hotspot_models::LatLng;

use crate::ranking::HotspotMap;

/// Length of one bucket, in milliseconds.
pub const ONE_DAY_MS: u64 = 1000 * 60 * 60 * 24;

/// Number of daily buckets kept.
pub const WINDOW_DAYS: usize = 14;

/// How long after an observation a later visit still counts as exposure.
pub const DEFAULT_EXPOSURE_PERIOD_MS: u64 = 1000 * 60 * 5;

/// The half-open span `[start_ms, end_ms)` one bucket covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// First millisecond of the day.
    pub start_ms: u64,
    /// First millisecond of the next day.
    pub end_ms: u64,
}

impl DayWindow {
    const fn starting_at(start_ms: u64) -> Self {
        Self {
            start_ms,
            end_ms: start_ms.saturating_add(ONE_DAY_MS),
        }
    }

    #[must_use]
    pub const fn contains(&self, time_ms: u64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }

    /// Whether the window shares any instant with `[from_ms, to_ms]`.
    #[must_use]
    pub const fn intersects(&self, from_ms: u64, to_ms: u64) -> bool {
        from_ms < self.end_ms && to_ms >= self.start_ms
    }
}

/// Earliest and latest instant the window accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// First accepted millisecond.
    pub from_ms: u64,
    /// First millisecond past the window.
    pub to_ms: u64,
}

/// One day of observations: timestamps keyed by geohash.
#[derive(Debug, Clone)]
pub struct DailyBucket {
    window: DayWindow,
    locations: BTreeMap<String, Vec<u64>>,
}

impl DailyBucket {
    fn new(window: DayWindow) -> Self {
        Self {
            window,
            locations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn window(&self) -> DayWindow {
        self.window
    }

    /// Number of observations in the bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    fn insert(&mut self, hash: String, time_ms: u64) {
        self.locations.entry(hash).or_default().push(time_ms);
    }

    /// Whether an observation inside `cell` happened at most `period_ms`
    /// before `time_ms`.
    fn overlaps(&self, cell: &str, time_ms: u64, period_ms: u64) -> bool {
        self.locations
            .range::<str, _>((std::ops::Bound::Included(cell), std::ops::Bound::Unbounded))
            .take_while(|(hash, _)| hash.starts_with(cell))
            .flat_map(|(_, times)| times)
            .any(|&t| time_ms >= t && time_ms <= t.saturating_add(period_ms))
    }
}

/// A [`HotspotMap`] limited to the last [`WINDOW_DAYS`] days.
#[derive(Debug, Clone)]
pub struct TimedHotspotMap {
    /// Oldest day first.
    buckets: VecDeque<DailyBucket>,
    map: HotspotMap,
}

impl TimedHotspotMap {
    /// Creates [`WINDOW_DAYS`] consecutive empty days, the first starting
    /// at `start_ms`.
    #[must_use]
    pub fn new(start_ms: u64) -> Self {
        let mut buckets = VecDeque::with_capacity(WINDOW_DAYS);
        let mut start = start_ms;
        for _ in 0..WINDOW_DAYS {
            let window = DayWindow::starting_at(start);
            start = window.end_ms;
            buckets.push_back(DailyBucket::new(window));
        }
        Self {
            buckets,
            map: HotspotMap::new(),
        }
    }

    /// Creates a window whose newest day is the UTC day containing
    /// `newest_ms`.
    #[must_use]
    pub fn ending_at(newest_ms: u64) -> Self {
        let newest_day = newest_ms - newest_ms % ONE_DAY_MS;
        let span = ONE_DAY_MS * (WINDOW_DAYS as u64 - 1);
        Self::new(newest_day.saturating_sub(span))
    }

    /// The span of time currently accepted.
    #[must_use]
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            from_ms: self.buckets.front().map_or(0, |b| b.window.start_ms),
            to_ms: self.buckets.back().map_or(0, |b| b.window.end_ms),
        }
    }

    /// Counts one observation at `position` taken at `time_ms`.
    ///
    /// Returns the geohash it was counted under, or `None` if `time_ms`
    /// falls outside the window.
    ///
    /// # Errors
    ///
    /// Returns [`GeohashError::CoordinateOutOfRange`] for invalid coordinates.
    pub fn record(
        &mut self,
        position: LatLng,
        time_ms: u64,
    ) -> Result<Option<String>, GeohashError> {
        let Some(bucket) = self
            .buckets
            .iter_mut()
            .find(|b| b.window.contains(time_ms))
        else {
            return Ok(None);
        };
        let hash = self.map.record(position)?;
        bucket.insert(hash.clone(), time_ms);
        Ok(Some(hash))
    }

    /// Advances the window by one day. The oldest day is dropped and its
    /// observations stop counting. Returns how many observations expired.
    pub fn new_day(&mut self) -> usize {
        let Some(expired) = self.buckets.pop_front() else {
            return 0;
        };
        let next_start = self
            .buckets
            .back()
            .map_or(expired.window.end_ms, |b| b.window.end_ms);
        self.buckets
            .push_back(DailyBucket::new(DayWindow::starting_at(next_start)));

        for (hash, times) in &expired.locations {
            for _ in times {
                self.map.remove(hash);
            }
        }

        let count = expired.len();
        log::info!(
            "Expired {count} observations from day starting at {}",
            expired.window.start_ms
        );
        count
    }

    /// Whether anything was observed inside `hash` or one of its eight
    /// neighbors at most `period_ms` before `time_ms`.
    ///
    /// `hash` should be no longer than the record precision; shorter
    /// hashes match every observation inside them.
    ///
    /// # Errors
    ///
    /// Returns [`GeohashError`] if `hash` is not a valid geohash.
    pub fn match_position(
        &self,
        hash: &str,
        time_ms: u64,
        period_ms: u64,
    ) -> Result<bool, GeohashError> {
        let mut cells = vec![hash.to_ascii_lowercase()];
        cells.extend(neighbors(hash)?.to_vec());

        let from_ms = time_ms.saturating_sub(period_ms);
        Ok(self
            .buckets
            .iter()
            .filter(|b| b.window.intersects(from_ms, time_ms))
            .any(|b| cells.iter().any(|cell| b.overlaps(cell, time_ms, period_ms))))
    }

    /// The ranking over every observation still in the window.
    #[must_use]
    pub const fn map(&self) -> &HotspotMap {
        &self.map
    }

    /// Daily buckets, oldest first.
    pub fn buckets(&self) -> impl Iterator<Item = &DailyBucket> {
        self.buckets.iter()
    }
}

#[cfg(test)]
mod tests {
    use hotspot_map_hotspot_models::RawHotSpot;

    use super::*;

    const START: u64 = 1_600_000_000_000 - 1_600_000_000_000 % ONE_DAY_MS;

    fn berlin() -> LatLng {
        LatLng::new(52.5200, 13.4050)
    }

    #[test]
    fn creates_consecutive_days() {
        let timed = TimedHotspotMap::new(START);
        let windows: Vec<DayWindow> = timed.buckets().map(DailyBucket::window).collect();
        assert_eq!(windows.len(), WINDOW_DAYS);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
        assert_eq!(
            timed.time_range(),
            TimeRange {
                from_ms: START,
                to_ms: START + ONE_DAY_MS * WINDOW_DAYS as u64,
            }
        );
    }

    #[test]
    fn ending_at_puts_newest_day_last() {
        let newest = START + 3 * ONE_DAY_MS + 12_345;
        let timed = TimedHotspotMap::ending_at(newest);
        let last = timed.buckets().last().unwrap().window();
        assert!(last.contains(newest));
        assert_eq!(last.start_ms, START + 3 * ONE_DAY_MS);
    }

    #[test]
    fn records_only_inside_window() {
        let mut timed = TimedHotspotMap::new(START);
        assert!(timed.record(berlin(), START + 10).unwrap().is_some());
        assert!(timed.record(berlin(), START - 1).unwrap().is_none());
        let past_end = timed.time_range().to_ms;
        assert!(timed.record(berlin(), past_end).unwrap().is_none());

        let top = timed.map().top_hot_spots(7, 10);
        assert_eq!(top.len(), 1);
        assert!((top[0].power - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_day_expires_oldest_observations() {
        let mut timed = TimedHotspotMap::new(START);
        let hash = timed.record(berlin(), START + 1).unwrap().unwrap();
        timed.record(berlin(), START + 2).unwrap();
        timed.record(berlin(), START + ONE_DAY_MS + 5).unwrap();
        assert_eq!(timed.map().count(&hash), 3);

        let before = timed.time_range();
        assert_eq!(timed.new_day(), 2);
        assert_eq!(timed.map().count(&hash), 1);

        let after = timed.time_range();
        assert_eq!(after.from_ms, before.from_ms + ONE_DAY_MS);
        assert_eq!(after.to_ms, before.to_ms + ONE_DAY_MS);
        assert_eq!(timed.buckets().count(), WINDOW_DAYS);

        // The freed day now accepts observations.
        assert!(timed.record(berlin(), before.to_ms).unwrap().is_some());
    }

    #[test]
    fn expired_days_drop_out_of_ranking() {
        let mut timed = TimedHotspotMap::new(START);
        timed.record(berlin(), START).unwrap();
        timed.new_day();
        assert!(timed.map().is_empty());
        assert_eq!(timed.map().top_hot_spots(7, 10), Vec::<RawHotSpot>::new());
    }

    #[test]
    fn matches_same_cell_within_period() {
        let mut timed = TimedHotspotMap::new(START);
        let seen = START + 1_000_000;
        let hash = timed.record(berlin(), seen).unwrap().unwrap();

        let period = DEFAULT_EXPOSURE_PERIOD_MS;
        assert!(timed.match_position(&hash, seen, period).unwrap());
        assert!(timed.match_position(&hash, seen + period, period).unwrap());
        assert!(!timed.match_position(&hash, seen + period + 1, period).unwrap());
        assert!(!timed.match_position(&hash, seen - 1, period).unwrap());
    }

    #[test]
    fn matches_neighboring_and_coarser_cells() {
        let mut timed = TimedHotspotMap::new(START);
        let seen = START + 500;
        let hash = timed.record(berlin(), seen).unwrap().unwrap();

        let east = neighbors(&hash).unwrap().e;
        assert!(timed.match_position(&east, seen + 1, 10).unwrap());
        assert!(timed.match_position(&hash[..6], seen, 10).unwrap());

        let far = hotspot_map_geohash::encode(LatLng::new(48.8566, 2.3522), 9).unwrap();
        assert!(!timed.match_position(&far, seen, 10).unwrap());
    }

    #[test]
    fn matches_across_day_boundary() {
        let mut timed = TimedHotspotMap::new(START);
        let seen = START + ONE_DAY_MS - 10;
        let hash = timed.record(berlin(), seen).unwrap().unwrap();
        assert!(timed.match_position(&hash, START + ONE_DAY_MS + 5, 60).unwrap());
    }

    #[test]
    fn match_rejects_invalid_hash() {
        let timed = TimedHotspotMap::new(START);
        assert!(timed.match_position("sv8a", START, 10).is_err());
    }
}
