//! Per-request authorization.
//!
//! Every command except `bind` starts here: the caller's identity either maps
//! to a stored bot key, which becomes the `Authorization` header value, or
//! the command stops with [`CommandError::NotBound`] before any network I/O.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::db::CredentialStore;
use crate::error::CommandError;

/// Authorization scheme the Turbo backend expects.
pub const BOT_KEY_SCHEME: &str = "BotKey";

/// Resolved credential for one command invocation.
#[derive(Clone)]
pub struct BotKeyAuth {
    key: SecretString,
}

impl BotKeyAuth {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    /// The raw bot key, for endpoints that carry it in the body (unbind).
    pub fn key(&self) -> &SecretString {
        &self.key
    }

    /// Full `Authorization` header value: `BotKey <key>`.
    pub fn header_value(&self) -> SecretString {
        SecretString::from(format!(
            "{} {}",
            BOT_KEY_SCHEME,
            self.key.expose_secret()
        ))
    }
}

impl fmt::Debug for BotKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotKeyAuth")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Look up the credential bound to `identity`.
pub async fn resolve(
    store: &dyn CredentialStore,
    identity: &str,
) -> Result<BotKeyAuth, CommandError> {
    match store.get_key(identity).await? {
        Some(key) => Ok(BotKeyAuth::new(key)),
        None => {
            tracing::debug!(identity, "Rejected command from unbound identity");
            Err(CommandError::NotBound)
        }
    }
}

/// Succeeds only when `identity` has no credential yet.
pub async fn ensure_unbound(
    store: &dyn CredentialStore,
    identity: &str,
) -> Result<(), CommandError> {
    if store.exists(identity).await? {
        return Err(CommandError::AlreadyBound);
    }
    Ok(())
}
