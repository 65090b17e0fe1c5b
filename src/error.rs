//! Error types for turbobot.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Credential store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Identity {0} is already bound")]
    DuplicateIdentity(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

/// Failures talking to the Turbo backend before a status code is available.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// Outcome of a single chat command that did not produce a normal reply.
///
/// Every variant is recoverable: the dispatcher renders it into chat text and
/// nothing propagates past the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("identity is not bound")]
    NotBound,

    #[error("identity is already bound")]
    AlreadyBound,

    #[error("missing or malformed argument")]
    MissingArgument,

    #[error("unexpected response shape: {0}")]
    Validation(String),

    #[error("backend rejected request with status {status}")]
    RemoteRejected {
        status: u16,
        message: Option<String>,
    },

    #[error("{0}")]
    Transport(String),

    #[error("credential store error: {0}")]
    Store(#[from] DatabaseError),
}

impl From<BackendError> for CommandError {
    fn from(err: BackendError) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_become_transport_failures() {
        let err = CommandError::from(BackendError::Timeout {
            url: "https://api.example/web/currentTickets".to_string(),
            timeout: Duration::from_secs(5),
        });
        match err {
            CommandError::Transport(reason) => {
                assert!(reason.contains("timed out"));
                assert!(reason.contains("/web/currentTickets"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_identity_wraps_into_store_error() {
        let err = CommandError::from(DatabaseError::DuplicateIdentity("42".to_string()));
        assert!(matches!(
            err,
            CommandError::Store(DatabaseError::DuplicateIdentity(_))
        ));
        assert_eq!(
            CommandError::from(DatabaseError::Query("boom".to_string())).to_string(),
            "credential store error: Query failed: boom"
        );
    }
}
