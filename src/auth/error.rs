//! Error types for access control.

use thiserror::Error;

/// Reasons a request is refused.
///
/// Messages match what the frontend and the home-automation hub already
/// display, so keep them stable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No password in a login call.
    #[error("Password is required")]
    PasswordRequired,

    /// Wrong password in a login call.
    #[error("Invalid password")]
    InvalidPassword,

    /// Login attempted but no password is configured.
    #[error("Login not configured")]
    LoginNotConfigured,

    /// Admin login attempted but no admin password is configured.
    #[error("Admin login not configured")]
    AdminLoginNotConfigured,

    /// Missing or wrong client API key.
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Missing or wrong admin API key.
    #[error("Invalid or missing admin API key")]
    InvalidAdminApiKey,

    /// Admin operation attempted but no admin key is configured.
    #[error("Admin access not configured")]
    AdminNotConfigured,

    /// Write attempted from outside the internal network.
    #[error("Write operations are restricted to internal network only")]
    ExternalNetwork,

    /// Admin operation attempted from outside the internal network.
    #[error("Admin operations are restricted to internal network only")]
    AdminExternalNetwork,
}

impl AuthError {
    /// HTTP status code the glue layer should answer with.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::PasswordRequired => 400,
            Self::InvalidPassword
            | Self::InvalidApiKey
            | Self::InvalidAdminApiKey
            | Self::AdminNotConfigured => 401,
            Self::ExternalNetwork | Self::AdminExternalNetwork => 403,
            Self::LoginNotConfigured | Self::AdminLoginNotConfigured => 503,
        }
    }
}

/// Result type alias for access control.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AuthError::PasswordRequired.status_code(), 400);
        assert_eq!(AuthError::InvalidApiKey.status_code(), 401);
        assert_eq!(AuthError::AdminNotConfigured.status_code(), 401);
        assert_eq!(AuthError::ExternalNetwork.status_code(), 403);
        assert_eq!(AuthError::LoginNotConfigured.status_code(), 503);
    }

    #[test]
    fn messages() {
        assert_eq!(
            AuthError::InvalidApiKey.to_string(),
            "Invalid or missing API key"
        );
        assert_eq!(
            AuthError::AdminExternalNetwork.to_string(),
            "Admin operations are restricted to internal network only"
        );
    }
}
