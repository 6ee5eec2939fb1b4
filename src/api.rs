//! Entry point the HTTP layer and the bot call into.
//!
//! [`TravelCore`] ties storage, access control and the location transforms
//! together. Every guarded operation takes the [`RequestContext`] of the
//! incoming request and checks it before touching storage.

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{AccessControl, AuthError, RequestContext};
use crate::config::TrackerConfig;
use crate::location::{
    build_markers, format_timestamp, AddNoteRequest, CreatePositionRequest, LocationError,
    MapMarker, NightStopClassifier, Note, Obfuscator, Position, TravelStats,
    UpdatePositionRequest,
};
use crate::storage::{PositionStorage, StorageError};

/// Name reported by [`TravelCore::health`].
pub const SERVICE_NAME: &str = "vartarvipavag-server";

/// Error type for facade operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Location(#[from] LocationError),

    /// The addressed resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),
}

impl CoreError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Auth(err) => err.status_code(),
            Self::Storage(StorageError::Location(_)) | Self::Location(_) | Self::Validation(_) => {
                400
            }
            Self::Storage(_) => 500,
            Self::NotFound(_) => 404,
        }
    }

    /// Message safe to show to clients. Storage details stay in the log.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(StorageError::Location(err)) => err.to_string(),
            Self::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// JSON envelope used by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Wraps a facade result, returning the status code alongside.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartarvipavag_core::api::{ApiResponse, CoreError};
    ///
    /// let (status, body) = ApiResponse::<()>::from_result(Err(CoreError::NotFound("Position")));
    /// assert_eq!(status, 404);
    /// assert_eq!(body.error.as_deref(), Some("Position not found"));
    /// ```
    #[must_use]
    pub fn from_result(result: Result<T>) -> (u16, Self) {
        Self::with_success_status(result, 200)
    }

    /// Like [`Self::from_result`], answering 201 on success. Used for
    /// creates.
    #[must_use]
    pub fn created(result: Result<T>) -> (u16, Self) {
        Self::with_success_status(result, 201)
    }

    fn with_success_status(result: Result<T>, status: u16) -> (u16, Self) {
        match result {
            Ok(data) => (status, Self::ok(data)),
            Err(err) => (err.status_code(), Self::error(err.public_message())),
        }
    }
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: String,
    pub service: String,
}

/// Core interface for the travel tracker.
#[derive(Debug)]
pub struct TravelCore {
    config: TrackerConfig,
    storage: PositionStorage,
    access: AccessControl,
    classifier: NightStopClassifier,
    obfuscator: Obfuscator,
}

impl TravelCore {
    /// Opens the database at `config.database_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        let storage = PositionStorage::new(&config.database_path)?;
        Ok(Self::with_storage(config, storage))
    }

    /// Uses an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartarvipavag_core::{RequestContext, TrackerConfig, TravelCore};
    ///
    /// let core = TravelCore::in_memory(TrackerConfig::default()).unwrap();
    /// assert!(core.list_positions(&RequestContext::local()).unwrap().is_empty());
    /// ```
    pub fn in_memory(config: TrackerConfig) -> Result<Self> {
        let storage = PositionStorage::in_memory()?;
        Ok(Self::with_storage(config, storage))
    }

    fn with_storage(config: TrackerConfig, storage: PositionStorage) -> Self {
        info!(
            "travel core ready (timezone {}, night stop hour {})",
            config.home_timezone,
            config.night_stop_hour.get()
        );
        if config.security.api_key.is_none() && config.security.client_password.is_none() {
            warn!("no API key configured, reads are open");
        }

        Self {
            access: AccessControl::new(&config.security),
            classifier: config.classifier(),
            obfuscator: config.obfuscator(),
            config,
            storage,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub const fn storage(&self) -> &PositionStorage {
        &self.storage
    }

    // ===== Position Operations =====

    /// All positions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is wrong or storage fails.
    pub fn list_positions(&self, ctx: &RequestContext) -> Result<Vec<Position>> {
        self.access.validate_api_key(ctx)?;
        Ok(self.storage.find_all()?)
    }

    /// Most recent position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when nothing has been recorded.
    pub fn latest_position(&self, ctx: &RequestContext) -> Result<Position> {
        self.access.validate_api_key(ctx)?;
        self.storage
            .latest()?
            .ok_or(CoreError::NotFound("Position"))
    }

    /// Records a new position.
    ///
    /// # Errors
    ///
    /// Returns an error for external requests, invalid coordinates or a
    /// storage failure.
    pub fn create_position(
        &self,
        ctx: &RequestContext,
        request: &CreatePositionRequest,
    ) -> Result<Position> {
        self.access.only_internal_network(ctx)?;
        request.validate()?;

        Ok(self.storage.create(request)?)
    }

    /// Updates fields of an existing position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown id. An update with no
    /// fields returns the position unchanged.
    pub fn update_position(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: &UpdatePositionRequest,
    ) -> Result<Position> {
        self.access.only_internal_network(ctx)?;
        request.validate()?;

        self.storage
            .update(id, request)?
            .ok_or(CoreError::NotFound("Position"))
    }

    /// Deletes a position and its notes.
    ///
    /// # Errors
    ///
    /// Requires the admin key from the internal network. Returns
    /// [`CoreError::NotFound`] for an unknown id.
    pub fn delete_position(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        self.access.require_admin_and_local_network(ctx)?;
        if !self.storage.delete(id)? {
            return Err(CoreError::NotFound("Position"));
        }
        Ok(())
    }

    /// Attaches a note to a position.
    ///
    /// # Errors
    ///
    /// Returns an error for external requests, blank text or an unknown
    /// position.
    pub fn add_note(
        &self,
        ctx: &RequestContext,
        position_id: &str,
        request: &AddNoteRequest,
    ) -> Result<Note> {
        self.access.only_internal_network(ctx)?;
        request.validate()?;

        self.storage
            .add_note(position_id, request)?
            .ok_or(CoreError::NotFound("Position"))
    }

    // ===== Public View =====

    /// Obfuscated markers for the public map.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is wrong or storage fails.
    pub fn public_markers(&self, ctx: &RequestContext) -> Result<Vec<MapMarker>> {
        self.access.validate_api_key(ctx)?;
        let positions = self.storage.find_all()?;
        let markers = build_markers(&positions, &self.classifier, &self.obfuscator);
        debug!("built {} markers", markers.len());
        Ok(markers)
    }

    /// Journey statistics over the true positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is wrong or storage fails.
    pub fn travel_stats(&self, ctx: &RequestContext) -> Result<TravelStats> {
        self.access.validate_api_key(ctx)?;
        let positions = self.storage.find_all()?;
        Ok(TravelStats::compute(&positions, &self.classifier))
    }

    // ===== Auth Operations =====

    /// Exchanges a password for an API key.
    ///
    /// # Errors
    ///
    /// See [`AccessControl::login`].
    pub fn login(&self, password: &str, is_admin: bool) -> Result<String> {
        Ok(self.access.login(password, is_admin)?)
    }

    #[must_use]
    pub fn health(&self) -> Health {
        Health {
            status: "ok".to_string(),
            timestamp: format_timestamp(&Utc::now()),
            service: SERVICE_NAME.to_string(),
        }
    }
}
