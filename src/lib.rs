//! Vart är vi på väg core library
//!
//! Core functionality for the Interrail travel tracker: recorded positions,
//! night-stop detection, obfuscated public map data and access control.
//! The HTTP server and the Telegram bot are thin layers over [`TravelCore`].

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod config;
pub mod location;
pub mod storage;

pub use api::{ApiResponse, CoreError, Health, TravelCore};
pub use auth::RequestContext;
pub use config::TrackerConfig;
