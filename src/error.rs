//! Error types for the fleet image syncer.
//!
//! Per-event failures ([`SyncError`]) are contained to the event that raised them;
//! the dispatch loop logs them and moves on. Startup failures ([`Error::Config`],
//! [`Error::Connection`]) and an abnormal end of the inbound feed are fatal.

use thiserror::Error;
use tonic::Status;

/// A specialized Result type for syncer startup and lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Payload did not resolve to a fleet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("message content is not a fleet: {found}")]
pub struct UnwrapError {
    /// Short description of the shape that was found instead
    pub found: String,
}

/// Failure while handling a single lifecycle event.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to process event: {0}")]
    Unwrap(#[from] UnwrapError),

    #[error("failed to check image status: {0}")]
    StatusQuery(#[source] Status),

    #[error("failed to pull image: {0}")]
    Pull(#[source] Status),

    #[error("fleet {fleet} has no container image in its template")]
    MissingImage { fleet: String },
}

impl SyncError {
    /// Stage label used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Unwrap(_) => "unwrap",
            Self::StatusQuery(_) => "image_status",
            Self::Pull(_) => "pull_image",
            Self::MissingImage { .. } => "snapshot",
        }
    }
}

/// Abnormal termination of the inbound lifecycle feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feed disconnected: {0}")]
    Disconnected(String),
}

/// Process-level errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to create connection to: {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("fleet feed terminated: {0}")]
    Feed(#[from] FeedError),

    #[error("background dispatch task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::StatusQuery(Status::unavailable("socket closed"));
        assert!(err.to_string().starts_with("failed to check image status"));
        assert!(err.to_string().contains("socket closed"));

        let err = SyncError::Pull(Status::not_found("manifest unknown"));
        assert!(err.to_string().starts_with("failed to pull image"));

        let err = SyncError::from(UnwrapError {
            found: "object with keys [kind]".to_owned(),
        });
        assert!(err.to_string().starts_with("failed to process event"));
        assert_eq!(err.stage(), "unwrap");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = config::ConfigError::NotFound("runtime.endpoint".to_owned()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("runtime.endpoint"));
    }
}
