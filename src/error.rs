//! Error types for relay-dl
//!
//! The taxonomy follows what a job can run into:
//! - [`Error::InvalidSource`] - bad or missing input, reported before a job starts
//! - [`TransferError`] - backend failure mid-job, turns the job `Failed`
//! - [`Error::Notification`] - a message could not be delivered, logged only
//! - [`Error::Publish`] - a link could not be normalized, degrades to the raw path
//!
//! HTTP status mapping for the status API lives here as well ([`ToHttpStatus`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for relay-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for relay-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "public_host")
        key: Option<String>,
    },

    /// The trigger could not be resolved into a transfer source
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// A backend failed while transferring
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// The messaging collaborator rejected a send/edit/delete
    #[error("notification error: {0}")]
    Notification(String),

    /// A retrieval link could not be normalized
    #[error("publish error: {0}")]
    Publish(String),

    /// A job for the same request is already running
    #[error("job {0} is already running")]
    DuplicateJob(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Backend-level failures surfaced to the orchestrator as a terminal `Failed` event
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote server answered with a non-success status
    #[error("server returned HTTP {status} for {url}")]
    Http {
        /// HTTP status code
        status: u16,
        /// The requested URL
        url: String,
    },

    /// Connection or protocol failure
    #[error("network failure: {0}")]
    Network(String),

    /// Writing the output failed
    #[error("failed to write {path}: {reason}")]
    Io {
        /// The file being written
        path: PathBuf,
        /// Underlying error
        reason: String,
    },

    /// The media fetch API failed
    #[error("media fetch failed: {0}")]
    Media(String),

    /// The swarm client reported an error (no peers, invalid descriptor, RPC failure)
    #[error("swarm error: {0}")]
    Swarm(String),

    /// The backend stopped without reporting completion or failure
    #[error("backend stopped without a result")]
    Interrupted,

    /// The job was cancelled during shutdown
    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// Build an [`TransferError::Io`] from a path and an I/O error
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        TransferError::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransferError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => TransferError::Network(err.to_string()),
        }
    }
}

/// API error response format
///
/// ```json
/// { "error": { "code": "duplicate_job", "message": "job 1:2 is already running" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_source")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidSource(_) => 400,

            // 409 Conflict
            Error::DuplicateJob(_) => 409,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Publish(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Transfer(_) => 502,
            Error::Notification(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidSource(_) => "invalid_source",
            Error::Transfer(e) => match e {
                TransferError::Http { .. } => "http_error",
                TransferError::Network(_) => "network_error",
                TransferError::Io { .. } => "io_error",
                TransferError::Media(_) => "media_error",
                TransferError::Swarm(_) => "swarm_error",
                TransferError::Interrupted => "interrupted",
                TransferError::Cancelled => "cancelled",
            },
            Error::Notification(_) => "notification_error",
            Error::Publish(_) => "publish_error",
            Error::DuplicateJob(_) => "duplicate_job",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::DuplicateJob(id) => Some(serde_json::json!({ "job_id": id })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Transfer(TransferError::Http { status, url }) => Some(serde_json::json!({
                "status": status,
                "url": url,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
