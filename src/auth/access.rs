//! API-key and network checks.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use log::{info, warn};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::error::{AuthError, Result};

/// Hex SHA-256 of a password; the API key derived from it.
///
/// Matches the digest the browser computes with Web Crypto before login.
///
/// ```
/// use vartarvipavag_core::auth::hash_password;
///
/// assert_eq!(
///     hash_password("password"),
///     "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
/// );
/// ```
#[must_use]
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Configured secrets and network allow-list.
#[derive(Clone, Default)]
pub struct SecurityConfig {
    /// Password for the family/friends view.
    pub client_password: Option<Zeroizing<String>>,
    /// Explicit client API key; derived from the password when unset.
    pub api_key: Option<Zeroizing<String>>,
    pub admin_password: Option<Zeroizing<String>>,
    /// Explicit admin API key; derived from the admin password when unset.
    pub admin_api_key: Option<Zeroizing<String>>,
    /// Extra addresses treated as internal.
    pub allowed_ips: Vec<IpAddr>,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &Option<Zeroizing<String>>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("SecurityConfig")
            .field("client_password", &redact(&self.client_password))
            .field("api_key", &redact(&self.api_key))
            .field("admin_password", &redact(&self.admin_password))
            .field("admin_api_key", &redact(&self.admin_api_key))
            .field("allowed_ips", &self.allowed_ips)
            .finish()
    }
}

/// What the access checks need to know about an incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Peer address of the connection.
    pub remote_addr: Option<IpAddr>,
    /// `X-Forwarded-For` header.
    pub forwarded_for: Option<String>,
    /// `X-Real-IP` header.
    pub real_ip: Option<String>,
    /// `X-API-Key` header.
    pub api_key: Option<String>,
    /// `Authorization` header.
    pub authorization: Option<String>,
}

impl RequestContext {
    /// A direct request from localhost with no headers.
    #[must_use]
    pub fn local() -> Self {
        Self {
            remote_addr: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            ..Self::default()
        }
    }

    /// A request that came in through the reverse proxy.
    #[must_use]
    pub fn proxied(client: &str) -> Self {
        Self {
            remote_addr: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            forwarded_for: Some(client.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, key: &str) -> Self {
        self.authorization = Some(format!("Bearer {key}"));
        self
    }

    /// Key from `X-API-Key`, else from `Authorization` minus `Bearer `.
    #[must_use]
    pub fn provided_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.authorization
                    .as_deref()
                    .map(|auth| auth.strip_prefix("Bearer ").unwrap_or(auth))
            })
            .filter(|k| !k.is_empty())
    }

    /// True when the reverse proxy added forwarding headers.
    #[must_use]
    pub const fn is_proxied(&self) -> bool {
        self.forwarded_for.is_some() || self.real_ip.is_some()
    }

    /// Best-effort client address for logging.
    #[must_use]
    pub fn client_ip(&self) -> String {
        self.forwarded_for
            .clone()
            .or_else(|| self.real_ip.clone())
            .or_else(|| self.remote_addr.map(|ip| ip.to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || ip.to_ipv4_mapped().is_some_and(is_private_v4)
}

/// Enforces the API-key and network rules.
pub struct AccessControl {
    client_password: Option<Zeroizing<String>>,
    admin_password: Option<Zeroizing<String>>,
    api_key: Option<Zeroizing<String>>,
    admin_api_key: Option<Zeroizing<String>>,
    allowed_ips: Vec<IpAddr>,
}

impl AccessControl {
    /// Resolves the effective keys from `config`.
    #[must_use]
    pub fn new(config: &SecurityConfig) -> Self {
        let derive = |key: &Option<Zeroizing<String>>, password: &Option<Zeroizing<String>>| {
            key.clone()
                .filter(|k| !k.is_empty())
                .or_else(|| {
                    password
                        .as_ref()
                        .filter(|p| !p.is_empty())
                        .map(|p| Zeroizing::new(hash_password(p)))
                })
        };

        Self {
            api_key: derive(&config.api_key, &config.client_password),
            admin_api_key: derive(&config.admin_api_key, &config.admin_password),
            client_password: config.client_password.clone().filter(|p| !p.is_empty()),
            admin_password: config.admin_password.clone().filter(|p| !p.is_empty()),
            allowed_ips: config.allowed_ips.clone(),
        }
    }

    /// Whether reads are open to anyone.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.api_key.is_none()
    }

    /// Checks the client API key. Passes when no key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidApiKey`] for a missing or wrong key.
    pub fn validate_api_key(&self, ctx: &RequestContext) -> Result<()> {
        let Some(expected) = &self.api_key else {
            return Ok(());
        };
        match ctx.provided_key() {
            Some(provided) if secrets_match(provided, expected) => Ok(()),
            _ => {
                warn!("rejected API key from {}", ctx.client_ip());
                Err(AuthError::InvalidApiKey)
            }
        }
    }

    /// Checks the admin API key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AdminNotConfigured`] when no admin key exists,
    /// [`AuthError::InvalidAdminApiKey`] for a missing or wrong key.
    pub fn validate_admin_api_key(&self, ctx: &RequestContext) -> Result<()> {
        let Some(expected) = &self.admin_api_key else {
            return Err(AuthError::AdminNotConfigured);
        };
        match ctx.provided_key() {
            Some(provided) if secrets_match(provided, expected) => Ok(()),
            _ => {
                warn!("rejected admin API key from {}", ctx.client_ip());
                Err(AuthError::InvalidAdminApiKey)
            }
        }
    }

    /// Whether a peer address counts as internal.
    #[must_use]
    pub fn is_internal_address(&self, ip: IpAddr) -> bool {
        self.allowed_ips.contains(&ip)
            || match ip {
                IpAddr::V4(v4) => is_private_v4(v4),
                IpAddr::V6(v6) => is_private_v6(v6),
            }
    }

    fn check_network(&self, ctx: &RequestContext, refusal: AuthError) -> Result<()> {
        info!("write request from {}", ctx.client_ip());

        if ctx.is_proxied() {
            return Err(refusal);
        }
        match ctx.remote_addr {
            Some(ip) if !self.is_internal_address(ip) => Err(refusal),
            _ => Ok(()),
        }
    }

    /// Allows only requests that did not pass through the reverse proxy
    /// and, when the peer is known, come from an internal address.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ExternalNetwork`] otherwise.
    pub fn only_internal_network(&self, ctx: &RequestContext) -> Result<()> {
        self.check_network(ctx, AuthError::ExternalNetwork)
    }

    /// Internal network first, then the admin key.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn require_admin_and_local_network(&self, ctx: &RequestContext) -> Result<()> {
        self.check_network(ctx, AuthError::AdminExternalNetwork)?;
        self.validate_admin_api_key(ctx)
    }

    /// Trades a password for the matching API key.
    ///
    /// # Errors
    ///
    /// - [`AuthError::PasswordRequired`] for an empty password
    /// - [`AuthError::LoginNotConfigured`] / [`AuthError::AdminLoginNotConfigured`]
    ///   when no password is set for the role
    /// - [`AuthError::InvalidPassword`] for a wrong password
    pub fn login(&self, password: &str, is_admin: bool) -> Result<String> {
        if password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }

        let (expected, key, not_configured) = if is_admin {
            (
                &self.admin_password,
                &self.admin_api_key,
                AuthError::AdminLoginNotConfigured,
            )
        } else {
            (
                &self.client_password,
                &self.api_key,
                AuthError::LoginNotConfigured,
            )
        };

        let (Some(expected), Some(key)) = (expected, key) else {
            return Err(not_configured);
        };

        if !secrets_match(&hash_password(password), &hash_password(expected)) {
            warn!("failed {} login", if is_admin { "admin" } else { "client" });
            return Err(AuthError::InvalidPassword);
        }

        Ok(key.as_str().to_owned())
    }
}

impl fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessControl")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "admin_api_key",
                &self.admin_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("allowed_ips", &self.allowed_ips)
            .finish_non_exhaustive()
    }
}
