//! Tracker configuration.
//!
//! Read from environment variables at startup. Tests build configs through
//! [`TrackerConfig::from_lookup`] instead of touching the process
//! environment.

use std::net::IpAddr;
use std::path::PathBuf;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::auth::SecurityConfig;
use crate::location::obfuscation::DEFAULT_DISPLACEMENT_METERS;
use crate::location::{NightStopClassifier, NightStopHour, ObfuscationSeed, Obfuscator};

/// Default `SQLite` file, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "data/interrail.db";

/// Default home timezone.
pub const DEFAULT_HOME_TIMEZONE: Tz = chrono_tz::Europe::Stockholm;

/// Error type for configuration loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Not an IANA timezone name.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Night stop hour must be between 0 and 23, got {0}")]
    InvalidNightStopHour(String),

    /// A numeric variable did not parse.
    #[error("Invalid number for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Obfuscation distance must be positive, got {0}")]
    InvalidDistance(String),

    #[error("Invalid IP address in ALLOWED_IPS: {0}")]
    InvalidIpAddress(String),
}

/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Everything the tracker needs to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub database_path: PathBuf,
    pub home_timezone: Tz,
    pub night_stop_hour: NightStopHour,
    pub obfuscation_seed: ObfuscationSeed,
    /// Displacement applied to public positions, in meters.
    pub obfuscation_distance_meters: f64,
    /// Secrets never leave the process.
    #[serde(skip)]
    pub security: SecurityConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            home_timezone: DEFAULT_HOME_TIMEZONE,
            night_stop_hour: NightStopHour::default(),
            obfuscation_seed: ObfuscationSeed::default(),
            obfuscation_distance_meters: DEFAULT_DISPLACEMENT_METERS,
            security: SecurityConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any variable that is set but invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the configuration through `lookup`. Unset and blank variables
    /// fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any variable that is set but invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartarvipavag_core::config::TrackerConfig;
    ///
    /// let config = TrackerConfig::from_lookup(|name| match name {
    ///     "HOME_TIMEZONE" => Some("Europe/Berlin".to_string()),
    ///     "NIGHT_STOP_HOUR" => Some("3".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.home_timezone, chrono_tz::Europe::Berlin);
    /// assert_eq!(config.night_stop_hour.get(), 3);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secret = |name: &str| var(name).map(Zeroizing::new);

        let mut config = Self::default();

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(tz) = var("HOME_TIMEZONE") {
            config.home_timezone = tz
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(tz.clone()))?;
        }

        if let Some(hour) = var("NIGHT_STOP_HOUR") {
            config.night_stop_hour = hour
                .parse::<u8>()
                .ok()
                .and_then(NightStopHour::new)
                .ok_or(ConfigError::InvalidNightStopHour(hour))?;
        }

        if let Some(seed) = var("OBFUSCATION_SEED") {
            config.obfuscation_seed = ObfuscationSeed::Text(seed);
        }

        if let Some(distance) = var("OBFUSCATION_DISTANCE_METERS") {
            let meters = distance
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "OBFUSCATION_DISTANCE_METERS",
                    value: distance.clone(),
                })?;
            if !meters.is_finite() || meters <= 0.0 {
                return Err(ConfigError::InvalidDistance(distance));
            }
            config.obfuscation_distance_meters = meters;
        }

        config.security = SecurityConfig {
            client_password: secret("CLIENT_PASSWORD"),
            api_key: secret("API_KEY"),
            admin_password: secret("ADMIN_PASSWORD"),
            admin_api_key: secret("ADMIN_API_KEY"),
            allowed_ips: var("ALLOWED_IPS")
                .map(|list| parse_ip_list(&list))
                .transpose()?
                .unwrap_or_default(),
        };

        Ok(config)
    }

    /// Classifier for the configured timezone and hour.
    #[must_use]
    pub const fn classifier(&self) -> NightStopClassifier {
        NightStopClassifier::new(self.home_timezone, self.night_stop_hour)
    }

    /// Obfuscator for the public view.
    #[must_use]
    pub fn obfuscator(&self) -> Obfuscator {
        Obfuscator::new(
            self.obfuscation_seed.clone(),
            self.obfuscation_distance_meters,
        )
    }
}

fn parse_ip_list(list: &str) -> Result<Vec<IpAddr>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidIpAddress(s.to_string()))
        })
        .collect()
}
