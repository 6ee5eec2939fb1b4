//! Access control for the position API.
//!
//! Three gates guard the operations:
//! - Reads need the client API key (when one is configured)
//! - Writes must come from the internal network, i.e. not through the
//!   reverse proxy
//! - Deletes need both the internal network and the admin API key
//!
//! API keys are the SHA-256 hex digest of the corresponding password unless
//! set explicitly. The login call trades a password for its key.

mod access;
mod error;

pub use access::{hash_password, AccessControl, RequestContext, SecurityConfig};
pub use error::{AuthError, Result};
