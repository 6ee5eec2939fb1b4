//! Deterministic coordinate obfuscation for the public map.
//!
//! Every position is pushed a fixed distance in a pseudo-random compass
//! direction. The directions come from a ChaCha stream seeded from a fixed
//! [`ObfuscationSeed`], so the same positions in the same order always land
//! on the same displaced points across reloads, while the exact GPS fixes
//! are never shown.
//!
//! A fresh generator is created for every call. Reproducibility depends only
//! on the seed and the input order, never on what was obfuscated before.
//!
//! # Precision vs. Privacy
//!
//! | Distance | Effect |
//! |----------|--------|
//! | 25 m     | Same building block |
//! | 50 m     | Default; same street, different house |
//! | 200 m    | Neighbourhood level |

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::types::Position;

/// Mean earth radius used for all spherical math in this crate.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Length of one degree of latitude on the reference sphere (~111 km).
pub const METERS_PER_DEGREE_LATITUDE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Displacement applied by [`obfuscate_positions`].
pub const DEFAULT_DISPLACEMENT_METERS: f64 = 50.0;

/// Latitudes beyond this are clamped before scaling longitude, keeping the
/// `1 / cos(lat)` factor finite at the poles.
///
/// Inside the band between this and ±90° the east-west part of the
/// displacement is shorter than the configured distance (about half of it
/// at 89.95°).
pub const MAX_SCALING_LATITUDE: f64 = 89.9;

/// Seed for the obfuscation stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObfuscationSeed {
    Number(u64),
    Text(String),
}

impl ObfuscationSeed {
    /// Builds a fresh generator positioned at the start of the stream.
    fn rng(&self) -> ChaCha8Rng {
        match self {
            Self::Number(n) => ChaCha8Rng::seed_from_u64(*n),
            Self::Text(text) => {
                let digest: [u8; 32] = Sha256::digest(text.as_bytes()).into();
                ChaCha8Rng::from_seed(digest)
            }
        }
    }
}

impl Default for ObfuscationSeed {
    fn default() -> Self {
        Self::Text("42".to_string())
    }
}

impl From<u64> for ObfuscationSeed {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ObfuscationSeed {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ObfuscationSeed {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Displaces positions by a constant distance in seeded directions.
#[derive(Debug, Clone, PartialEq)]
pub struct Obfuscator {
    seed: ObfuscationSeed,
    distance_meters: f64,
}

impl Obfuscator {
    #[must_use]
    pub const fn new(seed: ObfuscationSeed, distance_meters: f64) -> Self {
        Self {
            seed,
            distance_meters,
        }
    }

    #[must_use]
    pub const fn seed(&self) -> &ObfuscationSeed {
        &self.seed
    }

    #[must_use]
    pub const fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    /// Returns displaced copies of `positions` in the same order.
    ///
    /// One angle is drawn per position, in slice order. Only latitude and
    /// longitude change.
    #[must_use]
    pub fn apply(&self, positions: &[Position]) -> Vec<Position> {
        let mut rng = self.seed.rng();
        positions
            .iter()
            .map(|position| {
                let bearing = rng.gen_range(0.0..TAU);
                let (latitude, longitude) = displace(
                    position.latitude,
                    position.longitude,
                    self.distance_meters,
                    bearing,
                );
                Position {
                    latitude,
                    longitude,
                    ..position.clone()
                }
            })
            .collect()
    }
}

impl Default for Obfuscator {
    fn default() -> Self {
        Self::new(ObfuscationSeed::default(), DEFAULT_DISPLACEMENT_METERS)
    }
}

/// Obfuscates positions with the default displacement distance.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use vartarvipavag_core::location::{obfuscate_positions, ObfuscationSeed, Position};
///
/// let positions = vec![Position::new(Utc::now(), 48.8566, 2.3522)];
/// let seed = ObfuscationSeed::from("42");
///
/// let first = obfuscate_positions(&positions, &seed);
/// let second = obfuscate_positions(&positions, &seed);
/// assert_eq!(first, second);
/// assert_ne!(first[0].latitude, positions[0].latitude);
/// ```
#[must_use]
pub fn obfuscate_positions(positions: &[Position], seed: &ObfuscationSeed) -> Vec<Position> {
    Obfuscator::new(seed.clone(), DEFAULT_DISPLACEMENT_METERS).apply(positions)
}

/// Moves a point `distance` meters along `bearing` (radians, 0 = north,
/// clockwise).
///
/// Non-finite input is returned unchanged. The result latitude is clamped
/// to `[-90, 90]` and the longitude wrapped into `[-180, 180]`.
#[must_use]
pub fn displace(latitude: f64, longitude: f64, distance: f64, bearing: f64) -> (f64, f64) {
    if !latitude.is_finite() || !longitude.is_finite() {
        return (latitude, longitude);
    }

    let scaling_lat = latitude.clamp(-MAX_SCALING_LATITUDE, MAX_SCALING_LATITUDE);
    let lat_delta = distance * bearing.cos() / METERS_PER_DEGREE_LATITUDE;
    let lon_delta =
        distance * bearing.sin() / (METERS_PER_DEGREE_LATITUDE * scaling_lat.to_radians().cos());

    (
        (latitude + lat_delta).clamp(-90.0, 90.0),
        wrap_longitude(longitude + lon_delta),
    )
}

fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::stats::haversine_km;
    use chrono::{TimeZone, Utc};

    fn trip() -> Vec<Position> {
        [
            (59.3293, 18.0686),
            (57.7089, 11.9746),
            (55.6050, 13.0038),
            (55.6761, 12.5683),
            (53.5511, 9.9937),
        ]
        .iter()
        .enumerate()
        .map(|(i, (lat, lon))| {
            let hour = u32::try_from(i).unwrap();
            let mut p = Position::new(
                Utc.with_ymd_and_hms(2024, 7, 2, 8 + hour, 0, 0).unwrap(),
                *lat,
                *lon,
            );
            p.id = format!("p{i}");
            p.city = Some(format!("city {i}"));
            p
        })
        .collect()
    }

    #[test]
    fn same_seed_same_output() {
        let positions = trip();
        let seed = ObfuscationSeed::from("42");
        assert_eq!(
            obfuscate_positions(&positions, &seed),
            obfuscate_positions(&positions, &seed)
        );
    }

    #[test]
    fn repeated_calls_do_not_share_state() {
        let positions = trip();
        let obfuscator = Obfuscator::default();

        let first = obfuscator.apply(&positions);
        let _subset = obfuscator.apply(&positions[..2]);
        let again = obfuscator.apply(&positions);

        assert_eq!(first, again);
    }

    #[test]
    fn different_seeds_differ() {
        let positions = trip();
        let a = obfuscate_positions(&positions, &ObfuscationSeed::from(1_u64));
        let b = obfuscate_positions(&positions, &ObfuscationSeed::from(2_u64));
        assert_ne!(a, b);
    }

    #[test]
    fn text_and_number_seeds_are_distinct_streams() {
        let positions = trip();
        let text = obfuscate_positions(&positions, &ObfuscationSeed::from("42"));
        let number = obfuscate_positions(&positions, &ObfuscationSeed::from(42_u64));
        assert_ne!(text, number);
    }

    #[test]
    fn preserves_order_length_and_other_fields() {
        let positions = trip();
        let out = obfuscate_positions(&positions, &ObfuscationSeed::default());

        assert_eq!(out.len(), positions.len());
        for (original, moved) in positions.iter().zip(&out) {
            assert_eq!(original.id, moved.id);
            assert_eq!(original.timestamp, moved.timestamp);
            assert_eq!(original.city, moved.city);
            assert_eq!(original.source, moved.source);
        }
    }

    #[test]
    fn does_not_mutate_input() {
        let positions = trip();
        let before = positions.clone();
        let _ = obfuscate_positions(&positions, &ObfuscationSeed::default());
        assert_eq!(positions, before);
    }

    #[test]
    fn displacement_distance_is_constant() {
        let positions = trip();
        let out = obfuscate_positions(&positions, &ObfuscationSeed::default());
        for (original, moved) in positions.iter().zip(&out) {
            let meters = haversine_km(
                original.latitude,
                original.longitude,
                moved.latitude,
                moved.longitude,
            ) * 1000.0;
            assert!(
                (meters - DEFAULT_DISPLACEMENT_METERS).abs() < 0.01,
                "moved {meters} m"
            );
        }
    }

    #[test]
    fn custom_distance_is_respected() {
        let positions = trip();
        let out = Obfuscator::new(ObfuscationSeed::from(7_u64), 200.0).apply(&positions);
        let meters = haversine_km(
            positions[0].latitude,
            positions[0].longitude,
            out[0].latitude,
            out[0].longitude,
        ) * 1000.0;
        assert!((meters - 200.0).abs() < 0.05);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(obfuscate_positions(&[], &ObfuscationSeed::default()).is_empty());
    }

    #[test]
    fn displace_north_moves_latitude_only() {
        let (lat, lon) = displace(10.0, 20.0, METERS_PER_DEGREE_LATITUDE, 0.0);
        assert!((lat - 11.0).abs() < 1e-9);
        assert!((lon - 20.0).abs() < 1e-9);
    }

    #[test]
    fn displace_east_scales_with_latitude() {
        let bearing = std::f64::consts::FRAC_PI_2;
        let (_, lon_equator) = displace(0.0, 0.0, 1000.0, bearing);
        let (_, lon_sixty) = displace(60.0, 0.0, 1000.0, bearing);
        // cos(60°) = 0.5, so the same distance spans twice the longitude.
        assert!((lon_sixty / lon_equator - 2.0).abs() < 1e-9);
    }

    #[test]
    fn poles_stay_finite() {
        for lat in [90.0, -90.0, 89.999_99] {
            let (new_lat, new_lon) = displace(lat, 0.0, 50.0, 1.0);
            assert!(new_lat.is_finite());
            assert!(new_lon.is_finite());
            assert!((-90.0..=90.0).contains(&new_lat));
            assert!((-180.0..=180.0).contains(&new_lon));
        }
    }

    #[test]
    fn antimeridian_wraps() {
        let bearing = std::f64::consts::FRAC_PI_2;
        let (_, lon) = displace(0.0, 180.0, 1000.0, bearing);
        assert!(lon < -179.0);
        let (_, lon) = displace(0.0, -180.0, 1000.0, -bearing);
        assert!(lon > 179.0);
    }

    #[test]
    fn large_displacement_near_pole_stays_in_range() {
        let bearing = std::f64::consts::FRAC_PI_2;
        for distance in [200_000.0, 5_000_000.0] {
            for lat in [89.95, -89.95, 89.9] {
                let (new_lat, new_lon) = displace(lat, 0.0, distance, bearing);
                assert!((-90.0..=90.0).contains(&new_lat), "lat {new_lat}");
                assert!((-180.0..=180.0).contains(&new_lon), "lon {new_lon}");
            }
        }
    }

    #[test]
    fn wrap_longitude_normalises_many_turns() {
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        assert!((wrap_longitude(670.5) - (-49.5)).abs() < 1e-9);
        assert!((wrap_longitude(-900.0) + 180.0).abs() < 1e-9);
        assert!((wrap_longitude(725.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_passes_through() {
        let (lat, lon) = displace(f64::NAN, 1.0, 50.0, 0.3);
        assert!(lat.is_nan());
        assert_eq!(lon, 1.0);
    }

    #[test]
    fn seed_serde_forms() {
        let number: ObfuscationSeed = serde_json::from_str("42").unwrap();
        assert_eq!(number, ObfuscationSeed::Number(42));
        let text: ObfuscationSeed = serde_json::from_str("\"honeymoon\"").unwrap();
        assert_eq!(text, ObfuscationSeed::from("honeymoon"));
    }
}
