//! Location module.
//!
//! Pure transforms over recorded positions:
//! - Night-stop classification in the home timezone
//! - Deterministic coordinate obfuscation for the public map
//! - Travel statistics and map markers
//!
//! None of these perform I/O or keep state between calls, so they are safe
//! to call from any number of requests at once.
//!
//! # Example Usage
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use vartarvipavag_core::location::{
//!     NightStopClassifier, NightStopHour, Obfuscator, Position, TravelStats,
//! };
//!
//! let positions = vec![
//!     Position::new(Utc.with_ymd_and_hms(2024, 7, 2, 20, 0, 0).unwrap(), 55.6050, 13.0038),
//!     Position::new(Utc.with_ymd_and_hms(2024, 7, 3, 0, 10, 0).unwrap(), 55.6761, 12.5683),
//! ];
//!
//! let classifier = NightStopClassifier::new(chrono_tz::Europe::Stockholm, NightStopHour::default());
//! let stops = classifier.night_stops(&positions);
//! assert_eq!(stops.len(), 1);
//!
//! let public = Obfuscator::default().apply(&positions);
//! assert_eq!(public.len(), positions.len());
//!
//! let stats = TravelStats::compute(&positions, &classifier);
//! assert_eq!(stats.night_count, 1);
//! ```

mod error;
pub mod markers;
pub mod night_stop;
pub mod obfuscation;
pub mod stats;
pub mod types;

pub use error::{LocationError, Result};
pub use markers::{build_markers, format_swedish, MapMarker, MarkerRole};
pub use night_stop::{
    classify_night_stops, night_key_for, NightAssignment, NightGroup, NightKey,
    NightStopClassifier, NightStopHour, PositionKind,
};
pub use obfuscation::{obfuscate_positions, ObfuscationSeed, Obfuscator};
pub use stats::{haversine_km, PositionWithDistance, TravelStats};
pub use types::{
    format_timestamp, parse_timestamp, validate_coordinates, AddNoteRequest,
    CreatePositionRequest, Note, Position, PositionSource, UpdatePositionRequest,
};
