//! Position and note types.
//!
//! These mirror the JSON shapes exchanged with the map frontend and the
//! home-automation hub, so field names are kept in `snake_case` on the wire.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::{LocationError, Result};

/// Where a position or note was recorded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    /// Pushed by the Home Assistant automation.
    HomeAssistant,
    /// Sent through the Telegram bot.
    Telegram,
    /// Entered by hand.
    #[default]
    Manual,
}

impl PositionSource {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HomeAssistant => "home_assistant",
            Self::Telegram => "telegram",
            Self::Manual => "manual",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "home_assistant" => Some(Self::HomeAssistant),
            "telegram" => Some(Self::Telegram),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// A free-text note attached to a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique note identifier.
    pub id: String,
    /// Note body.
    pub text: String,
    /// When the note was written.
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: DateTime<Utc>,
    /// Where the note came from.
    pub source: PositionSource,
    /// Telegram username of the author, when sent through the bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_user: Option<String>,
}

/// A recorded GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Opaque unique identifier.
    pub id: String,
    /// When the fix was recorded.
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: DateTime<Utc>,
    /// WGS-84 latitude in degrees.
    pub latitude: f64,
    /// WGS-84 longitude in degrees.
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Notes attached to this position, oldest first.
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub source: PositionSource,
}

impl Position {
    /// Creates a position with a fresh id and no optional fields.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            latitude,
            longitude,
            city: None,
            country: None,
            notes: Vec::new(),
            source: PositionSource::default(),
        }
    }
}

/// Body of a position create call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Legacy single-note field; stored as a [`Note`].
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: Option<PositionSource>,
}

impl CreatePositionRequest {
    /// Checks the coordinates of the request.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::InvalidCoordinate`] when either coordinate is
    /// out of range or not finite.
    pub fn validate(&self) -> Result<()> {
        validate_coordinates(self.latitude, self.longitude)
    }
}

/// Body of a position update call. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePositionRequest {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Legacy single-note field; appended as a new manual [`Note`].
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdatePositionRequest {
    /// Returns true when the request would not change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.city.is_none()
            && self.country.is_none()
            && self.notes.is_none()
    }

    /// Checks whichever coordinates are present.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::InvalidCoordinate`] for an out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if let Some(lat) = self.latitude {
            validate_latitude(lat)?;
        }
        if let Some(lon) = self.longitude {
            validate_longitude(lon)?;
        }
        Ok(())
    }
}

/// Body of an add-note call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNoteRequest {
    pub text: String,
    #[serde(default)]
    pub source: Option<PositionSource>,
    #[serde(default)]
    pub telegram_user: Option<String>,
}

impl AddNoteRequest {
    /// Creates a manual note request.
    #[must_use]
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: Some(PositionSource::Manual),
            telegram_user: None,
        }
    }

    /// Rejects blank note text.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::EmptyNote`] when the text is blank.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(LocationError::EmptyNote);
        }
        Ok(())
    }
}

/// Checks that a latitude is finite and within `[-90, 90]`.
///
/// # Errors
///
/// Returns [`LocationError::InvalidCoordinate`] otherwise.
pub fn validate_latitude(lat: f64) -> Result<()> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(LocationError::InvalidCoordinate(
            "Latitude must be between -90 and 90".to_string(),
        ))
    }
}

/// Checks that a longitude is finite and within `[-180, 180]`.
///
/// # Errors
///
/// Returns [`LocationError::InvalidCoordinate`] otherwise.
pub fn validate_longitude(lon: f64) -> Result<()> {
    if lon.is_finite() && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(LocationError::InvalidCoordinate(
            "Longitude must be between -180 and 180".to_string(),
        ))
    }
}

/// Checks a coordinate pair.
///
/// # Errors
///
/// Returns [`LocationError::InvalidCoordinate`] for the first bad value.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    validate_latitude(lat)?;
    validate_longitude(lon)
}

/// Parses an ISO-8601 timestamp.
///
/// Zoned timestamps (`Z` or `+02:00`) are converted to UTC. Timestamps
/// without an offset are taken to be UTC.
///
/// # Errors
///
/// Returns [`LocationError::InvalidTimestamp`] if the string is neither.
///
/// # Examples
///
/// ```
/// use vartarvipavag_core::location::parse_timestamp;
///
/// let zoned = parse_timestamp("2024-07-03T02:15:00+02:00").unwrap();
/// let naive = parse_timestamp("2024-07-03T00:15:00").unwrap();
/// assert_eq!(zoned, naive);
/// ```
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(s) {
        return Ok(zoned.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| LocationError::InvalidTimestamp(s.to_string()))
}

/// Formats a timestamp the way the storage layer and the frontend expect:
/// `2024-07-02T22:00:00.000Z`.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
