//! Error types for location input validation.

use thiserror::Error;

/// Errors raised when location input fails validation.
///
/// The pure transforms (night-stop classification, obfuscation, statistics)
/// never fail; these errors come from the boundaries that build positions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// Latitude or longitude out of range or not finite.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Timestamp could not be parsed as ISO-8601.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Night-stop hour outside `0..=23`.
    #[error("Night stop hour must be between 0 and 23, got {0}")]
    InvalidNightStopHour(u8),

    /// Note text was blank.
    #[error("Note text is required")]
    EmptyNote,
}

/// Result type alias for location validation.
pub type Result<T> = std::result::Result<T, LocationError>;
