//! Night-stop classification.
//!
//! A night runs from the evening of day N to the morning of day N+1 in the
//! travellers' home timezone. Every position is assigned to exactly one
//! night, and for each night the position whose local time of day is
//! closest to the configured night-stop hour is picked as the place the
//! travellers slept. Everything else is a daily position.
//!
//! The classification is a pure function of the positions and the
//! configuration: it never looks at the clock and never depends on the
//! order of the input slice.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use vartarvipavag_core::location::{classify_night_stops, NightStopHour, Position};
//!
//! let evening = Position::new(Utc.with_ymd_and_hms(2024, 7, 2, 22, 0, 0).unwrap(), 55.6, 13.0);
//! let late = Position::new(Utc.with_ymd_and_hms(2024, 7, 3, 0, 15, 0).unwrap(), 55.7, 13.1);
//!
//! let stops = classify_night_stops(
//!     &[evening.clone(), late.clone()],
//!     chrono_tz::UTC,
//!     NightStopHour::default(),
//! );
//! assert_eq!(stops.len(), 1);
//! assert!(stops.contains(&late.id));
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use log::debug;
use serde::{Deserialize, Serialize};

use super::error::LocationError;
use super::types::Position;

/// Default local hour the travellers are assumed to be asleep.
pub const DEFAULT_NIGHT_STOP_HOUR: u8 = 2;

/// Local hours before this belong to the night that ended that morning.
const MORNING_CUTOFF_HOUR: u32 = 12;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

/// Local hour (`0..=23`) used as the target when picking night stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct NightStopHour(u8);

impl NightStopHour {
    /// Returns `None` for hours outside `0..=23`.
    #[must_use]
    pub const fn new(hour: u8) -> Option<Self> {
        if hour < 24 {
            Some(Self(hour))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Target time of day in minutes since local midnight.
    #[must_use]
    pub fn target_minutes(self) -> f64 {
        f64::from(self.0) * 60.0
    }
}

impl Default for NightStopHour {
    fn default() -> Self {
        Self(DEFAULT_NIGHT_STOP_HOUR)
    }
}

impl TryFrom<u8> for NightStopHour {
    type Error = LocationError;

    fn try_from(hour: u8) -> Result<Self, Self::Error> {
        Self::new(hour).ok_or(LocationError::InvalidNightStopHour(hour))
    }
}

impl From<NightStopHour> for u8 {
    fn from(hour: NightStopHour) -> Self {
        hour.0
    }
}

/// A timestamp decomposed into home-timezone calendar fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTime {
    /// Local calendar date.
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
    /// Minutes since local midnight, including fractional seconds.
    pub minutes_since_midnight: f64,
}

impl LocalTime {
    /// Converts a UTC instant into the given timezone.
    #[must_use]
    pub fn from_utc(timestamp: &DateTime<Utc>, tz: Tz) -> Self {
        let local = timestamp.with_timezone(&tz);
        let hour = local.hour();
        let minute = local.minute();
        let seconds = f64::from(local.second()) + f64::from(local.nanosecond()) / 1e9;

        Self {
            date: local.date_naive(),
            hour,
            minute,
            minutes_since_midnight: f64::from(hour * 60 + minute) + seconds / 60.0,
        }
    }

    /// The night this local time belongs to.
    #[must_use]
    pub fn night_key(&self) -> NightKey {
        if self.hour < MORNING_CUTOFF_HOUR {
            NightKey(self.date.pred_opt().unwrap_or(self.date))
        } else {
            NightKey(self.date)
        }
    }
}

/// Identity of a night: the local calendar date of the evening it starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NightKey(NaiveDate);

impl NightKey {
    #[must_use]
    pub const fn new(evening: NaiveDate) -> Self {
        Self(evening)
    }

    /// Date of the evening the night begins on.
    #[must_use]
    pub const fn evening(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for NightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Returns the night a UTC timestamp belongs to in `tz`.
#[must_use]
pub fn night_key_for(timestamp: &DateTime<Utc>, tz: Tz) -> NightKey {
    LocalTime::from_utc(timestamp, tz).night_key()
}

/// Distance in minutes between two times of day on a 24-hour clock.
///
/// ```
/// use vartarvipavag_core::location::night_stop::circular_minutes;
///
/// // 23:30 and 02:00 are 150 minutes apart across midnight.
/// assert_eq!(circular_minutes(23.0 * 60.0 + 30.0, 120.0), 150.0);
/// ```
#[must_use]
pub fn circular_minutes(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % MINUTES_PER_DAY;
    diff.min(MINUTES_PER_DAY - diff)
}

/// Classification of a single position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionKind {
    /// Where the travellers slept that night.
    NightStop,
    /// Any other recorded position.
    Daily,
}

impl PositionKind {
    #[must_use]
    pub const fn is_night_stop(self) -> bool {
        matches!(self, Self::NightStop)
    }
}

/// Positions that fell into one night, and the one picked to represent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightGroup {
    /// Member ids in chronological order.
    pub members: Vec<String>,
    /// Id of the chosen night stop.
    pub night_stop: String,
}

/// Every populated night, keyed by the evening it starts on.
///
/// Recomputed on each call; never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightAssignment {
    nights: BTreeMap<NightKey, NightGroup>,
}

impl NightAssignment {
    /// Number of populated nights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nights.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &NightKey) -> Option<&NightGroup> {
        self.nights.get(key)
    }

    /// Nights in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (&NightKey, &NightGroup)> {
        self.nights.iter()
    }

    /// The night a position id was assigned to.
    #[must_use]
    pub fn night_of(&self, id: &str) -> Option<NightKey> {
        self.nights
            .iter()
            .find(|(_, group)| group.members.iter().any(|m| m == id))
            .map(|(key, _)| *key)
    }

    /// Ids of the chosen night stops.
    #[must_use]
    pub fn night_stops(&self) -> HashSet<String> {
        self.nights
            .values()
            .map(|group| group.night_stop.clone())
            .collect()
    }
}

struct Candidate<'a> {
    index: usize,
    position: &'a Position,
    distance: f64,
}

/// Picks one night stop per night in a home timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightStopClassifier {
    home_timezone: Tz,
    night_stop_hour: NightStopHour,
}

impl NightStopClassifier {
    #[must_use]
    pub const fn new(home_timezone: Tz, night_stop_hour: NightStopHour) -> Self {
        Self {
            home_timezone,
            night_stop_hour,
        }
    }

    #[must_use]
    pub const fn home_timezone(&self) -> Tz {
        self.home_timezone
    }

    #[must_use]
    pub const fn night_stop_hour(&self) -> NightStopHour {
        self.night_stop_hour
    }

    /// Groups positions into nights and picks each night's stop.
    ///
    /// Within a night, members are ordered by timestamp (input position
    /// breaks exact timestamp ties), and the first member with the smallest
    /// circular distance to the target hour wins.
    #[must_use]
    pub fn assign(&self, positions: &[Position]) -> NightAssignment {
        let target = self.night_stop_hour.target_minutes();
        let mut grouped: BTreeMap<NightKey, Vec<Candidate<'_>>> = BTreeMap::new();

        for (index, position) in positions.iter().enumerate() {
            let local = LocalTime::from_utc(&position.timestamp, self.home_timezone);
            grouped
                .entry(local.night_key())
                .or_default()
                .push(Candidate {
                    index,
                    position,
                    distance: circular_minutes(local.minutes_since_midnight, target),
                });
        }

        let nights = grouped
            .into_iter()
            .filter_map(|(key, mut candidates)| {
                candidates.sort_by(|a, b| {
                    a.position
                        .timestamp
                        .cmp(&b.position.timestamp)
                        .then(a.index.cmp(&b.index))
                });

                let winner = candidates.iter().reduce(|best, candidate| {
                    if candidate.distance < best.distance {
                        candidate
                    } else {
                        best
                    }
                })?;

                let group = NightGroup {
                    night_stop: winner.position.id.clone(),
                    members: candidates.iter().map(|c| c.position.id.clone()).collect(),
                };
                Some((key, group))
            })
            .collect::<BTreeMap<_, _>>();

        debug!(
            "assigned {} positions to {} nights (tz={}, hour={})",
            positions.len(),
            nights.len(),
            self.home_timezone,
            self.night_stop_hour.get()
        );

        NightAssignment { nights }
    }

    /// Ids of the night stops among `positions`.
    #[must_use]
    pub fn night_stops(&self, positions: &[Position]) -> HashSet<String> {
        self.assign(positions).night_stops()
    }

    /// Kind of every position, in input order.
    #[must_use]
    pub fn classify(&self, positions: &[Position]) -> Vec<PositionKind> {
        let stops = self.night_stops(positions);
        positions
            .iter()
            .map(|p| {
                if stops.contains(&p.id) {
                    PositionKind::NightStop
                } else {
                    PositionKind::Daily
                }
            })
            .collect()
    }
}

/// Ids of the night stops among `positions`; one per populated night.
#[must_use]
pub fn classify_night_stops(
    positions: &[Position],
    home_timezone: Tz,
    night_stop_hour: NightStopHour,
) -> HashSet<String> {
    NightStopClassifier::new(home_timezone, night_stop_hour).night_stops(positions)
}
