//! Batch intensity normalization and color bucketing.
//!
//! Normalization is relative to the batch: the weakest sample maps to 0.0
//! and the strongest to 1.0. Classification is therefore a two-pass
//! operation, first [`PowerRange::of`] over the whole batch, then a
//! per-sample map.

use hotspot_map_hotspot_models::{ClassifiedSample, ColorBucket, DecodedSample};

use crate::HotSpotError;

/// Lower bounds (exclusive) for each bucket, hottest first. Anything not
/// above the last bound is [`ColorBucket::Green`].
const THRESHOLDS: [(f64, ColorBucket); 5] = [
    (0.9, ColorBucket::Red),
    (0.7, ColorBucket::Orange),
    (0.5, ColorBucket::Amber),
    (0.3, ColorBucket::Yellow),
    (0.1, ColorBucket::YellowGreen),
];

/// Minimum and maximum raw power observed in a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerRange {
    /// Weakest power in the batch; normalizes to 0.0.
    pub min: f64,
    /// Strongest power in the batch; normalizes to 1.0.
    pub max: f64,
}

impl PowerRange {
    /// Computes the extrema of `samples`, or `None` for an empty batch.
    #[must_use]
    pub fn of(samples: &[DecodedSample]) -> Option<Self> {
        let (first, rest) = samples.split_first()?;
        let init = Self {
            min: first.raw_power,
            max: first.raw_power,
        };
        Some(rest.iter().fold(init, |range, sample| Self {
            min: range.min.min(sample.raw_power),
            max: range.max.max(sample.raw_power),
        }))
    }

    /// Returns `true` when every sample shares the same power.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.max - self.min <= 0.0
    }

    /// Rescales `power` into `0.0..=1.0`.
    ///
    /// A degenerate range maps everything to 0.0. Ranges wider than
    /// `f64::MAX` are rescaled at half magnitude.
    #[must_use]
    pub fn normalize(&self, power: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        let span = self.max - self.min;
        let normalized = if span.is_finite() {
            (power - self.min) / span
        } else {
            power.mul_add(0.5, -self.min * 0.5) / self.max.mul_add(0.5, -self.min * 0.5)
        };
        normalized.clamp(0.0, 1.0)
    }
}

/// Maps a normalized intensity to its color bucket.
#[must_use]
pub fn bucket_for(intensity: f64) -> ColorBucket {
    THRESHOLDS
        .iter()
        .find(|(bound, _)| intensity > *bound)
        .map_or(ColorBucket::Green, |(_, bucket)| *bucket)
}

/// Normalizes and classifies a batch of samples, preserving order.
///
/// # Errors
///
/// Returns [`HotSpotError::EmptyBatch`] if `samples` is empty.
pub fn classify(samples: &[DecodedSample]) -> Result<Vec<ClassifiedSample>, HotSpotError> {
    let range = PowerRange::of(samples).ok_or(HotSpotError::EmptyBatch)?;

    if range.is_degenerate() {
        log::debug!(
            "All {} samples share power {}; intensities collapse to 0",
            samples.len(),
            range.min
        );
    }

    Ok(samples
        .iter()
        .map(|sample| {
            let normalized_intensity = range.normalize(sample.raw_power);
            ClassifiedSample {
                latitude: sample.latitude,
                longitude: sample.longitude,
                normalized_intensity,
                color_bucket: bucket_for(normalized_intensity),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use hotspot_map_hotspot_models::LatLng;

    use super::*;

    fn samples(powers: &[f64]) -> Vec<DecodedSample> {
        powers
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                #[allow(clippy::cast_precision_loss)]
                let offset = i as f64 * 0.01;
                DecodedSample::new(LatLng::new(52.5 + offset, 13.4 - offset), p)
            })
            .collect()
    }

    fn intensities(classified: &[ClassifiedSample]) -> Vec<f64> {
        classified.iter().map(|c| c.normalized_intensity).collect()
    }

    #[test]
    fn classifies_example_batch() {
        let classified = classify(&samples(&[1000.0, 500.0, 100.0])).unwrap();
        let n = intensities(&classified);
        assert!((n[0] - 1.0).abs() < 1e-12);
        assert!((n[1] - 400.0 / 900.0).abs() < 1e-12);
        assert!(n[2].abs() < 1e-12);
        let buckets: Vec<ColorBucket> = classified.iter().map(|c| c.color_bucket).collect();
        assert_eq!(
            buckets,
            [ColorBucket::Red, ColorBucket::Yellow, ColorBucket::Green]
        );
    }

    #[test]
    fn preserves_order_and_length() {
        let input = samples(&[3.0, 9.0, 1.0, 7.0, 5.0]);
        let classified = classify(&input).unwrap();
        assert_eq!(classified.len(), input.len());
        for (sample, out) in input.iter().zip(&classified) {
            assert_eq!(sample.position(), LatLng::new(out.latitude, out.longitude));
        }
    }

    #[test]
    fn does_not_assume_sorted_input() {
        // Strongest sample last and fewer than ten entries.
        let classified = classify(&samples(&[10.0, 20.0, 30.0])).unwrap();
        assert_eq!(classified[0].color_bucket, ColorBucket::Green);
        assert_eq!(classified[2].color_bucket, ColorBucket::Red);
    }

    #[test]
    fn intensities_stay_in_unit_range() {
        let classified = classify(&samples(&[-5.0, 0.0, 1e9, 42.0, 0.5])).unwrap();
        assert!(
            intensities(&classified)
                .iter()
                .all(|n| (0.0..=1.0).contains(n))
        );
    }

    #[test]
    fn extreme_power_span_stays_in_unit_range() {
        let classified = classify(&samples(&[-1.0e308, 0.0, 1.0e308])).unwrap();
        let n = intensities(&classified);
        assert!(n.iter().all(|n| (0.0..=1.0).contains(n)), "{n:?}");
        assert!(n[0].abs() < 1e-12);
        assert!((n[1] - 0.5).abs() < 1e-12);
        assert!((n[2] - 1.0).abs() < 1e-12);
        let buckets: Vec<ColorBucket> = classified.iter().map(|c| c.color_bucket).collect();
        assert_eq!(
            buckets,
            [ColorBucket::Green, ColorBucket::Yellow, ColorBucket::Red]
        );
    }

    #[test]
    fn equal_powers_normalize_to_zero() {
        let classified = classify(&samples(&[7.0, 7.0, 7.0])).unwrap();
        for c in &classified {
            assert!(!c.normalized_intensity.is_nan());
            assert!(c.normalized_intensity.abs() < f64::EPSILON);
            assert_eq!(c.color_bucket, ColorBucket::Green);
        }
    }

    #[test]
    fn single_sample_is_degenerate() {
        let classified = classify(&samples(&[12.0])).unwrap();
        assert!(classified[0].normalized_intensity.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_batch_is_an_error() {
        assert!(matches!(classify(&[]), Err(HotSpotError::EmptyBatch)));
    }

    #[test]
    fn threshold_boundaries_are_exclusive() {
        assert_eq!(bucket_for(0.9), ColorBucket::Orange);
        assert_eq!(bucket_for(0.900_000_1), ColorBucket::Red);
        assert_eq!(bucket_for(0.7), ColorBucket::Amber);
        assert_eq!(bucket_for(0.5), ColorBucket::Yellow);
        assert_eq!(bucket_for(0.3), ColorBucket::YellowGreen);
        assert_eq!(bucket_for(0.1), ColorBucket::Green);
        assert_eq!(bucket_for(0.0), ColorBucket::Green);
        assert_eq!(bucket_for(1.0), ColorBucket::Red);
    }

    #[test]
    fn every_bucket_is_reachable() {
        let hit: Vec<ColorBucket> = [0.95, 0.8, 0.6, 0.4, 0.2, 0.05]
            .into_iter()
            .map(bucket_for)
            .collect();
        assert_eq!(hit, ColorBucket::all());
    }

    #[test]
    fn power_range_of_batch() {
        let range = PowerRange::of(&samples(&[4.0, -2.0, 9.5])).unwrap();
        assert_eq!(range, PowerRange { min: -2.0, max: 9.5 });
        assert!(PowerRange::of(&[]).is_none());
    }
}
