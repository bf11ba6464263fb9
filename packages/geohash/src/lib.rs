#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geohash decoding and encoding.
//!
//! A geohash is a base-32 string where every character adds five bits of
//! interleaved longitude/latitude bisection, starting with longitude. Each
//! string therefore names a rectangular cell, and longer strings name
//! smaller cells. Hot-spot records carry their location as a geohash; this
//! crate turns them back into coordinates.

use geo::{Coord, Rect};
use hotspot_map_hotspot_models::LatLng;

/// The standard geohash alphabet (no `a`, `i`, `l`, `o`).
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Longest geohash [`encode`] will produce. Twelve characters resolve to
/// a few centimeters, below `f64` noise for real coordinates.
pub const MAX_PRECISION: usize = 12;

/// Errors that can occur while decoding or encoding geohashes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeohashError {
    /// The string contains a character outside the geohash alphabet.
    #[error("invalid geohash {hash:?}: {character:?} at position {position} is not a geohash character")]
    InvalidGeohash {
        /// The rejected input.
        hash: String,
        /// The offending character.
        character: char,
        /// Zero-based character position of the offending character.
        position: usize,
    },

    /// The string is empty and names no cell.
    #[error("invalid geohash: empty string")]
    Empty,

    /// The coordinate is outside the valid latitude/longitude range.
    #[error("coordinate ({latitude}, {longitude}) is out of range")]
    CoordinateOutOfRange {
        /// Offending latitude.
        latitude: f64,
        /// Offending longitude.
        longitude: f64,
    },

    /// The requested precision is not in `1..=MAX_PRECISION`.
    #[error("invalid geohash precision {precision}: expected 1-{max}", max = MAX_PRECISION)]
    InvalidPrecision {
        /// The requested precision.
        precision: usize,
    },
}

/// The cell a geohash names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeohashCell {
    /// Center of the cell.
    pub center: LatLng,
    /// Half the cell height, in degrees of latitude.
    pub latitude_error: f64,
    /// Half the cell width, in degrees of longitude.
    pub longitude_error: f64,
}

impl GeohashCell {
    /// Returns the cell as a rectangle (`x` = longitude, `y` = latitude).
    #[must_use]
    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.center.longitude - self.longitude_error,
                y: self.center.latitude - self.latitude_error,
            },
            Coord {
                x: self.center.longitude + self.longitude_error,
                y: self.center.latitude + self.latitude_error,
            },
        )
    }

    /// Returns `true` if `position` falls inside the cell (edges included).
    #[must_use]
    pub fn contains(&self, position: LatLng) -> bool {
        (position.latitude - self.center.latitude).abs() <= self.latitude_error
            && (position.longitude - self.center.longitude).abs() <= self.longitude_error
    }
}

/// The eight cells surrounding a geohash, at the same precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbors {
    /// North.
    pub n: String,
    /// North-east.
    pub ne: String,
    /// East.
    pub e: String,
    /// South-east.
    pub se: String,
    /// South.
    pub s: String,
    /// South-west.
    pub sw: String,
    /// West.
    pub w: String,
    /// North-west.
    pub nw: String,
}

impl Neighbors {
    /// Returns the neighbors clockwise starting from north.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        vec![
            self.n.clone(),
            self.ne.clone(),
            self.e.clone(),
            self.se.clone(),
            self.s.clone(),
            self.sw.clone(),
            self.w.clone(),
            self.nw.clone(),
        ]
    }
}

/// Decodes a geohash to the center of its cell.
///
/// Decoding is case-insensitive.
///
/// # Errors
///
/// Returns [`GeohashError::InvalidGeohash`] if the string contains a
/// character outside the geohash alphabet, or [`GeohashError::Empty`] for
/// an empty string.
pub fn decode(hash: &str) -> Result<LatLng, GeohashError> {
    decode_cell(hash).map(|cell| cell.center)
}

/// Decodes a geohash to its cell (center plus error margins).
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_cell(hash: &str) -> Result<GeohashCell, GeohashError> {
    if hash.is_empty() {
        return Err(GeohashError::Empty);
    }

    let mut lat = (-90.0_f64, 90.0_f64);
    let mut lng = (-180.0_f64, 180.0_f64);
    let mut is_lng = true;

    for (position, character) in hash.chars().enumerate() {
        let value = alphabet_index(character).ok_or_else(|| GeohashError::InvalidGeohash {
            hash: hash.to_string(),
            character,
            position,
        })?;

        for bit in (0..5).rev() {
            let range = if is_lng { &mut lng } else { &mut lat };
            let mid = f64::midpoint(range.0, range.1);
            if (value >> bit) & 1 == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            is_lng = !is_lng;
        }
    }

    Ok(GeohashCell {
        center: LatLng::new(f64::midpoint(lat.0, lat.1), f64::midpoint(lng.0, lng.1)),
        latitude_error: (lat.1 - lat.0) / 2.0,
        longitude_error: (lng.1 - lng.0) / 2.0,
    })
}

/// Encodes a position as a geohash of `precision` characters.
///
/// # Errors
///
/// Returns [`GeohashError::InvalidPrecision`] if `precision` is not in
/// `1..=MAX_PRECISION`, or [`GeohashError::CoordinateOutOfRange`] if the
/// position is not a finite coordinate inside `[-90, 90] x [-180, 180]`.
pub fn encode(position: LatLng, precision: usize) -> Result<String, GeohashError> {
    if !(1..=MAX_PRECISION).contains(&precision) {
        return Err(GeohashError::InvalidPrecision { precision });
    }
    let LatLng {
        latitude,
        longitude,
    } = position;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(GeohashError::CoordinateOutOfRange {
            latitude,
            longitude,
        });
    }

    let mut lat = (-90.0_f64, 90.0_f64);
    let mut lng = (-180.0_f64, 180.0_f64);
    let mut is_lng = true;
    let mut hash = String::with_capacity(precision);

    for _ in 0..precision {
        let mut value = 0usize;
        for _ in 0..5 {
            let (range, target) = if is_lng {
                (&mut lng, longitude)
            } else {
                (&mut lat, latitude)
            };
            let mid = f64::midpoint(range.0, range.1);
            value <<= 1;
            if target >= mid {
                value |= 1;
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            is_lng = !is_lng;
        }
        hash.push(char::from(BASE32[value]));
    }

    Ok(hash)
}

/// Returns the eight cells adjacent to `hash`.
///
/// Longitude wraps across the antimeridian. Latitude is clamped at the
/// poles, so the northern neighbors of a polar cell are the cell's own row.
///
/// # Errors
///
/// Same as [`decode`].
pub fn neighbors(hash: &str) -> Result<Neighbors, GeohashError> {
    let cell = decode_cell(hash)?;
    let precision = hash.chars().count().min(MAX_PRECISION);
    let height = cell.latitude_error * 2.0;
    let width = cell.longitude_error * 2.0;

    let at = |lat_steps: f64, lng_steps: f64| {
        let latitude = lat_steps
            .mul_add(height, cell.center.latitude)
            .clamp(-90.0, 90.0);
        let longitude = wrap_longitude(lng_steps.mul_add(width, cell.center.longitude));
        encode(LatLng::new(latitude, longitude), precision)
    };

    Ok(Neighbors {
        n: at(1.0, 0.0)?,
        ne: at(1.0, 1.0)?,
        e: at(0.0, 1.0)?,
        se: at(-1.0, 1.0)?,
        s: at(-1.0, 0.0)?,
        sw: at(-1.0, -1.0)?,
        w: at(0.0, -1.0)?,
        nw: at(1.0, -1.0)?,
    })
}

fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

fn alphabet_index(character: char) -> Option<u8> {
    let lower = character.to_ascii_lowercase();
    BASE32
        .iter()
        .position(|&b| char::from(b) == lower)
        .and_then(|i| u8::try_from(i).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn decodes_known_cell() {
        let cell = decode_cell("ezs42").unwrap();
        assert!(cell.contains(LatLng::new(42.605, -5.603)));
        assert_close(cell.center.latitude, 42.604_980_468_75);
        assert_close(cell.center.longitude, -5.603_027_343_75);
    }

    #[test]
    fn decodes_hot_spot_within_cell_bounds() {
        let position = decode("sv8wrxf").unwrap();
        let cell = decode_cell("sv8wrxf").unwrap();
        let bounds = cell.bounds();
        assert!(position.longitude >= bounds.min().x && position.longitude <= bounds.max().x);
        assert!(position.latitude >= bounds.min().y && position.latitude <= bounds.max().y);
        // Seven characters is roughly a 150m x 150m cell.
        assert!(cell.latitude_error < 0.001);
        assert!(cell.longitude_error < 0.001);
    }

    #[test]
    fn matches_reference_decoder() {
        for hash in ["sv8wrxf", "sv8wrvb", "sv8wx2t", "u33db", "ezs42", "0", "zzzzzzzzzz"] {
            let ours = decode_cell(hash).unwrap();
            let (coord, lng_err, lat_err) = geohash::decode(hash).unwrap();
            assert_close(ours.center.latitude, coord.y);
            assert_close(ours.center.longitude, coord.x);
            assert_close(ours.latitude_error, lat_err);
            assert_close(ours.longitude_error, lng_err);
        }
    }

    #[test]
    fn decode_is_deterministic() {
        assert_eq!(decode("sv8wrxf").unwrap(), decode("sv8wrxf").unwrap());
    }

    #[test]
    fn decode_is_case_insensitive() {
        assert_eq!(decode("SV8WRXF").unwrap(), decode("sv8wrxf").unwrap());
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        let err = decode("sv8a").unwrap_err();
        assert_eq!(
            err,
            GeohashError::InvalidGeohash {
                hash: "sv8a".to_string(),
                character: 'a',
                position: 3,
            }
        );
        for hash in ["i", "l0", "o", "sv-8", "sv 8"] {
            assert!(
                matches!(decode(hash), Err(GeohashError::InvalidGeohash { .. })),
                "{hash:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(decode(""), Err(GeohashError::Empty));
    }

    #[test]
    fn encodes_known_position() {
        let hash = encode(LatLng::new(57.649_11, 10.407_44), 11).unwrap();
        assert_eq!(hash, "u4pruydqqvj");
    }

    #[test]
    fn encode_matches_reference_encoder() {
        let position = LatLng::new(52.5200, 13.4050);
        for precision in 1..=MAX_PRECISION {
            let reference = geohash::encode(
                geohash::Coord {
                    x: position.longitude,
                    y: position.latitude,
                },
                precision,
            )
            .unwrap();
            assert_eq!(encode(position, precision).unwrap(), reference);
        }
    }

    #[test]
    fn encoded_cell_contains_position() {
        let position = LatLng::new(-33.8688, 151.2093);
        let hash = encode(position, 9).unwrap();
        assert!(decode_cell(&hash).unwrap().contains(position));
    }

    #[test]
    fn encode_rejects_bad_input() {
        assert_eq!(
            encode(LatLng::new(0.0, 0.0), 0),
            Err(GeohashError::InvalidPrecision { precision: 0 })
        );
        assert_eq!(
            encode(LatLng::new(0.0, 0.0), MAX_PRECISION + 1),
            Err(GeohashError::InvalidPrecision {
                precision: MAX_PRECISION + 1
            })
        );
        assert!(matches!(
            encode(LatLng::new(91.0, 0.0), 5),
            Err(GeohashError::CoordinateOutOfRange { .. })
        ));
        assert!(matches!(
            encode(LatLng::new(f64::NAN, 0.0), 5),
            Err(GeohashError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn neighbors_match_reference() {
        let ours = neighbors("sv8wrxf").unwrap();
        let reference = geohash::neighbors("sv8wrxf").unwrap();
        assert_eq!(ours.n, reference.n);
        assert_eq!(ours.ne, reference.ne);
        assert_eq!(ours.e, reference.e);
        assert_eq!(ours.se, reference.se);
        assert_eq!(ours.s, reference.s);
        assert_eq!(ours.sw, reference.sw);
        assert_eq!(ours.w, reference.w);
        assert_eq!(ours.nw, reference.nw);
    }

    #[test]
    fn neighbors_are_adjacent_and_distinct() {
        let hash = "u33db";
        let all = neighbors(hash).unwrap().to_vec();
        assert_eq!(all.len(), 8);
        assert!(all.iter().all(|n| n.len() == hash.len() && n != hash));
        let mut unique = all.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn neighbors_wrap_across_antimeridian() {
        let hash = encode(LatLng::new(0.1, 179.99), 5).unwrap();
        let east = neighbors(&hash).unwrap().e;
        let east_center = decode(&east).unwrap();
        assert!(east_center.longitude < -179.0);
    }
}
