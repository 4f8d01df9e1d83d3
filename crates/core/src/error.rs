//! Unified error types for edstats.
//!
//! Message prefixes double as stable error codes for tool callers.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the edstats service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown entity kind).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The LMS source database could not be reached or queried.
    #[error("SOURCE_UNAVAILABLE: {0}")]
    SourceUnavailable(String),

    /// The cache store could not be read or written.
    #[error("CACHE_UNAVAILABLE: {0}")]
    CacheUnavailable(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Payload could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::SourceUnavailable(msg) => (-32020, msg.clone()),
            Error::CacheUnavailable(msg) => (-32021, msg.clone()),
            Error::Database(e) => (-32022, e.to_string()),
            Error::MigrationFailed(msg) => (-32022, msg.clone()),
            Error::Serialization(e) => (-32023, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SourceUnavailable("connection refused".to_string());
        assert!(err.to_string().contains("SOURCE_UNAVAILABLE"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidInput("bad entity".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32602);

        let err = Error::SourceUnavailable("down".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32020);
    }

    #[test]
    fn test_rusqlite_error_maps_to_database() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().starts_with("STORE_ERROR"));
    }
}
