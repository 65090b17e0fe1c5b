//! libSQL backend for the credential store.
//!
//! Embedded, file-backed SQLite-compatible storage. Every operation opens its
//! own connection so handlers running concurrently never share one.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use libsql::{Connection, Database as LibSqlDatabase};
use secrecy::SecretString;

use crate::db::CredentialStore;
use crate::error::DatabaseError;

/// Table and column names are those of existing `botKey.db` files, so a
/// database written by earlier deployments opens with its bindings intact.
/// The unique index covers tables created without a primary key.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    QQID TEXT PRIMARY KEY NOT NULL,
    bot_token TEXT NOT NULL,
    bot_key TEXT NOT NULL,
    bind_time TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_user_qqid ON user (QQID);
"#;

/// `bind_time` format, local wall-clock time to the second.
const BIND_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// libSQL credential store.
pub struct LibSqlBackend {
    db: Arc<LibSqlDatabase>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {}", e))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create a new connection to the database.
    ///
    /// Sets `PRAGMA busy_timeout = 5000` on every connection so concurrent
    /// writers wait up to 5 seconds instead of failing instantly with
    /// "database is locked".
    pub async fn connect(&self) -> Result<Connection, DatabaseError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {}", e)))?;
        conn.query("PRAGMA busy_timeout = 5000", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to set busy_timeout: {}", e)))?;
        Ok(conn)
    }
}

// ==================== Helper functions ====================

/// Format a bind time for the `bind_time` column.
pub(crate) fn fmt_bind_time(dt: &DateTime<Local>) -> String {
    dt.format(BIND_TIME_FORMAT).to_string()
}

/// Extract a text column from a libsql Row, returning empty string for NULL.
fn get_text(row: &libsql::Row, idx: i32) -> String {
    row.get::<String>(idx).unwrap_or_default()
}

fn is_unique_violation(err: &libsql::Error) -> bool {
    let message = err.to_string();
    message.contains("UNIQUE constraint failed") || message.contains("PRIMARY KEY")
}

#[async_trait]
impl CredentialStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        // WAL mode persists in the database file: all future connections benefit.
        conn.query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to enable WAL mode: {}", e)))?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| DatabaseError::Migration(format!("libSQL migration failed: {}", e)))?;
        Ok(())
    }

    async fn exists(&self, identity: &str) -> Result<bool, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM user WHERE QQID = ?1",
                libsql::params![identity],
            )
            .await?;

        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(DatabaseError::Query(e.to_string())),
        }
    }

    async fn get_key(&self, identity: &str) -> Result<Option<SecretString>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT bot_key FROM user WHERE QQID = ?1",
                libsql::params![identity],
            )
            .await?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(SecretString::from(get_text(&row, 0)))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(e.to_string())),
        }
    }

    async fn create(&self, identity: &str, token: &str, key: &str) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        let result = conn
            .execute(
                r#"
                INSERT INTO user (QQID, bot_token, bot_key, bind_time)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                libsql::params![identity, token, key, fmt_bind_time(&Local::now())],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(DatabaseError::DuplicateIdentity(identity.to_string()))
            }
            Err(e) => Err(DatabaseError::LibSql(e)),
        }
    }

    async fn delete(&self, identity: &str) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(
            "DELETE FROM user WHERE QQID = ?1",
            libsql::params![identity],
        )
        .await?;
        Ok(())
    }
}
