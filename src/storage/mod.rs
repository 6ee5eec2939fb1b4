//! `SQLite` persistence for positions and their notes.
//!
//! # Schema
//!
//! ```text
//! positions (id, timestamp, latitude, longitude, city, country, source)
//!     └── notes (id, position_id, text, timestamp, source, telegram_user)
//! ```
//!
//! Notes are deleted together with their position. Timestamps are stored as
//! ISO-8601 text with millisecond precision, so text order is time order.

mod error;
mod positions;

pub use error::{Result, StorageError};
pub use positions::PositionStorage;
