//! Credential persistence.
//!
//! One row per chat identity, mapping it to the bot key issued by the Turbo
//! backend at bind time. A row exists if and only if the identity is bound.

pub mod libsql;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::DatabaseError;

pub use self::libsql::LibSqlBackend;

/// Storage contract for identity-to-credential mappings.
///
/// Each call is its own unit of work; no operation spans multiple records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create the schema if it does not exist yet.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Whether a record exists for `identity`.
    async fn exists(&self, identity: &str) -> Result<bool, DatabaseError>;

    /// The bot key bound to `identity`, if any.
    async fn get_key(&self, identity: &str) -> Result<Option<SecretString>, DatabaseError>;

    /// Insert a new record stamped with the current time.
    ///
    /// Returns [`DatabaseError::DuplicateIdentity`] when the identity is
    /// already bound, including when a concurrent insert wins the race.
    async fn create(&self, identity: &str, token: &str, key: &str) -> Result<(), DatabaseError>;

    /// Remove the record for `identity`. Absent records are not an error.
    async fn delete(&self, identity: &str) -> Result<(), DatabaseError>;
}
