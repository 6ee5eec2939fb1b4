//! Map markers for the public journey view.
//!
//! Night stops are classified on the true coordinates; the coordinates are
//! obfuscated afterwards, in chronological order, so the public map never
//! shows exact fixes.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::night_stop::{NightStopClassifier, PositionKind};
use super::obfuscation::Obfuscator;
use super::types::Position;

const WEEKDAYS_SV: [&str; 7] = ["mån", "tis", "ons", "tors", "fre", "lör", "sön"];

const MONTHS_SV: [&str; 12] = [
    "jan", "feb", "mars", "apr", "maj", "juni", "juli", "aug", "sep", "okt", "nov", "dec",
];

/// What a marker represents on the journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "stop", rename_all = "snake_case")]
pub enum MarkerRole {
    /// First recorded position.
    Start,
    /// Most recent position.
    Current,
    /// Where the travellers slept.
    NightStop,
    /// Any other stop; 1-based chronological index.
    Stop(usize),
}

impl MarkerRole {
    /// Popup heading for this role.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Start => "Resans början".to_string(),
            Self::Current => "Nuvarande position".to_string(),
            Self::NightStop => "Nattstopp".to_string(),
            Self::Stop(n) => format!("Stopp {n}"),
        }
    }
}

/// A marker ready for the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    /// Obfuscated position.
    pub position: Position,
    pub role: MarkerRole,
    pub kind: PositionKind,
    pub label: String,
    /// Local time in Swedish, e.g. `ons 3 juli, kl 14:05`.
    pub time_label: String,
}

/// Formats a timestamp as `ons 3 juli, kl 14:05` in `tz`.
#[must_use]
pub fn format_swedish(timestamp: &DateTime<Utc>, tz: Tz) -> String {
    let local = timestamp.with_timezone(&tz);
    let weekday = WEEKDAYS_SV[local.weekday().num_days_from_monday() as usize];
    let month = MONTHS_SV[local.month0() as usize];
    format!(
        "{weekday} {} {month}, kl {:02}:{:02}",
        local.day(),
        local.hour(),
        local.minute()
    )
}

/// Builds markers in chronological order.
#[must_use]
pub fn build_markers(
    positions: &[Position],
    classifier: &NightStopClassifier,
    obfuscator: &Obfuscator,
) -> Vec<MapMarker> {
    let mut sorted = positions.to_vec();
    sorted.sort_by_key(|p| p.timestamp);

    let kinds = classifier.classify(&sorted);
    let obfuscated = obfuscator.apply(&sorted);
    let last = sorted.len().saturating_sub(1);
    let tz = classifier.home_timezone();

    obfuscated
        .into_iter()
        .zip(kinds)
        .enumerate()
        .map(|(i, (position, kind))| {
            let role = match (i, kind) {
                (0, _) => MarkerRole::Start,
                (i, _) if i == last => MarkerRole::Current,
                (_, PositionKind::NightStop) => MarkerRole::NightStop,
                (i, PositionKind::Daily) => MarkerRole::Stop(i + 1),
            };
            MapMarker {
                time_label: format_swedish(&position.timestamp, tz),
                label: role.label(),
                position,
                role,
                kind,
            }
        })
        .collect()
}
