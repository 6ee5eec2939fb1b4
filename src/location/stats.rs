//! Travel statistics shown under the map.

use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::night_stop::NightStopClassifier;
use super::obfuscation::EARTH_RADIUS_METERS;
use super::types::Position;

/// Great-circle distance in kilometers (haversine).
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS / 1000.0 * c
}

fn chronological(positions: &[Position]) -> Vec<&Position> {
    let mut sorted: Vec<&Position> = positions.iter().collect();
    sorted.sort_by_key(|p| p.timestamp);
    sorted
}

/// Sum of the legs between consecutive positions, in chronological order.
#[must_use]
pub fn total_distance_km(positions: &[Position]) -> f64 {
    chronological(positions)
        .windows(2)
        .map(|pair| {
            haversine_km(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            )
        })
        .sum()
}

/// Journey length in whole days, rounded up. Zero for fewer than two
/// positions.
#[must_use]
pub fn journey_duration_days(positions: &[Position]) -> u32 {
    let sorted = chronological(positions);
    let [first, .., last] = sorted.as_slice() else {
        return 0;
    };

    let elapsed = last.timestamp - first.timestamp;
    let day = Duration::days(1).num_milliseconds();
    let millis = elapsed.num_milliseconds().abs();
    let days = millis / day + i64::from(millis % day != 0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// A position with the leg that led to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionWithDistance {
    #[serde(flatten)]
    pub position: Position,
    /// Kilometers from the previous position; `None` for the first one.
    #[serde(rename = "distanceFromPrevious", skip_serializing_if = "Option::is_none")]
    pub distance_from_previous: Option<f64>,
}

/// Positions in chronological order, each with its distance from the
/// previous one.
#[must_use]
pub fn with_distances(positions: &[Position]) -> Vec<PositionWithDistance> {
    let sorted = chronological(positions);
    sorted
        .iter()
        .enumerate()
        .map(|(i, position)| PositionWithDistance {
            position: (*position).clone(),
            distance_from_previous: i.checked_sub(1).map(|prev| {
                haversine_km(
                    sorted[prev].latitude,
                    sorted[prev].longitude,
                    position.latitude,
                    position.longitude,
                )
            }),
        })
        .collect()
}

fn distinct_names<'a>(names: impl Iterator<Item = Option<&'a String>>) -> usize {
    names
        .flatten()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// Summary of a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelStats {
    #[serde(rename = "totalDistance")]
    pub total_distance_km: f64,
    pub total_countries: usize,
    pub total_cities: usize,
    #[serde(rename = "duration")]
    pub duration_days: u32,
    pub position_count: usize,
    pub night_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_position: Option<Position>,
}

impl TravelStats {
    /// Computes statistics over the true (not obfuscated) positions.
    #[must_use]
    pub fn compute(positions: &[Position], classifier: &NightStopClassifier) -> Self {
        Self {
            total_distance_km: total_distance_km(positions),
            total_countries: distinct_names(positions.iter().map(|p| p.country.as_ref())),
            total_cities: distinct_names(positions.iter().map(|p| p.city.as_ref())),
            duration_days: journey_duration_days(positions),
            position_count: positions.len(),
            night_count: classifier.assign(positions).len(),
            current_position: chronological(positions).last().map(|p| (*p).clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::night_stop::NightStopHour;
    use chrono::{TimeZone, Utc};

    fn at(id: &str, day: u32, hour: u32, lat: f64, lon: f64) -> Position {
        let mut p = Position::new(
            Utc.with_ymd_and_hms(2024, 12, day, hour, 0, 0).unwrap(),
            lat,
            lon,
        );
        p.id = id.to_string();
        p
    }

    fn classifier() -> NightStopClassifier {
        NightStopClassifier::new(chrono_tz::Europe::Stockholm, NightStopHour::default())
    }

    #[test]
    fn haversine_stockholm_copenhagen() {
        let km = haversine_km(59.3293, 18.0686, 55.6761, 12.5683);
        assert!((km - 522.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_km(48.85, 2.35, 48.85, 2.35).abs() < 1e-12);
    }

    #[test]
    fn total_distance_sorts_chronologically() {
        let a = at("a", 15, 8, 0.0, 0.0);
        let b = at("b", 15, 9, 0.0, 1.0);
        let c = at("c", 15, 10, 0.0, 2.0);

        let in_order = total_distance_km(&[a.clone(), b.clone(), c.clone()]);
        let shuffled = total_distance_km(&[c, a, b]);

        assert!((in_order - shuffled).abs() < 1e-9);
        assert!((in_order - 2.0 * haversine_km(0.0, 0.0, 0.0, 1.0)).abs() < 1e-9);
    }

    #[test]
    fn total_distance_needs_two_points() {
        assert_eq!(total_distance_km(&[]), 0.0);
        assert_eq!(total_distance_km(&[at("a", 15, 8, 1.0, 1.0)]), 0.0);
    }

    #[test]
    fn duration_rounds_up_partial_days() {
        let positions = [at("a", 15, 8, 0.0, 0.0), at("b", 16, 9, 0.0, 0.0)];
        assert_eq!(journey_duration_days(&positions), 2);

        let exact = [at("a", 15, 8, 0.0, 0.0), at("b", 17, 8, 0.0, 0.0)];
        assert_eq!(journey_duration_days(&exact), 2);

        let same_day = [at("a", 15, 8, 0.0, 0.0), at("b", 15, 20, 0.0, 0.0)];
        assert_eq!(journey_duration_days(&same_day), 1);
    }

    #[test]
    fn duration_zero_for_single_point() {
        assert_eq!(journey_duration_days(&[]), 0);
        assert_eq!(journey_duration_days(&[at("a", 15, 8, 0.0, 0.0)]), 0);
    }

    #[test]
    fn with_distances_first_has_none() {
        let out = with_distances(&[at("b", 15, 9, 0.0, 1.0), at("a", 15, 8, 0.0, 0.0)]);
        assert_eq!(out[0].position.id, "a");
        assert!(out[0].distance_from_previous.is_none());
        assert!(out[1].distance_from_previous.unwrap() > 100.0);

        let json = serde_json::to_value(&out[1]).unwrap();
        assert!(json.get("distanceFromPrevious").is_some());
        assert_eq!(json["id"], "b");
    }

    #[test]
    fn stats_counts_distinct_places() {
        let mut a = at("a", 15, 8, 59.33, 18.07);
        a.city = Some("Stockholm".to_string());
        a.country = Some("Sverige".to_string());
        let mut b = at("b", 15, 20, 55.68, 12.57);
        b.city = Some("Köpenhamn".to_string());
        b.country = Some("Danmark".to_string());
        let mut c = at("c", 16, 1, 55.68, 12.57);
        c.city = Some("köpenhamn ".to_string());
        c.country = Some("Danmark".to_string());
        let d = at("d", 16, 9, 55.68, 12.57);

        let stats = TravelStats::compute(&[a, b, c, d], &classifier());

        assert_eq!(stats.total_cities, 2);
        assert_eq!(stats.total_countries, 2);
        assert_eq!(stats.position_count, 4);
        assert_eq!(stats.duration_days, 2);
        assert_eq!(stats.current_position.map(|p| p.id), Some("d".to_string()));
    }

    #[test]
    fn stats_counts_nights() {
        // Stockholm is UTC+1 in December.
        let positions = [
            at("a", 15, 20, 59.33, 18.07),
            at("b", 16, 1, 59.33, 18.07),
            at("c", 16, 20, 57.70, 11.97),
        ];
        let stats = TravelStats::compute(&positions, &classifier());
        assert_eq!(stats.night_count, 2);
    }

    #[test]
    fn stats_on_empty_input() {
        let stats = TravelStats::compute(&[], &classifier());
        assert_eq!(stats.position_count, 0);
        assert_eq!(stats.night_count, 0);
        assert_eq!(stats.total_distance_km, 0.0);
        assert!(stats.current_position.is_none());
    }

    #[test]
    fn stats_json_uses_frontend_names() {
        let stats = TravelStats::compute(&[at("a", 15, 8, 1.0, 1.0)], &classifier());
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("totalDistance").is_some());
        assert!(json.get("totalCountries").is_some());
        assert!(json.get("duration").is_some());
        assert!(json.get("currentPosition").is_some());
    }
}
