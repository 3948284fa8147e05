//! Error types for REST API calls

use std::path::PathBuf;

use ha_rest_core::InputError;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to callers of the client
///
/// Network failures are never returned raw: the dispatcher first checks
/// that the server is alive and then maps the failed call onto one of the
/// HTTP variants below, or onto [`ClientError::ServerUnreachable`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad parameters, rejected before any network call
    #[error("invalid input: {source}")]
    InvalidInput {
        #[from]
        source: InputError,
    },

    /// Operation attempted without a successful connect
    #[error("not connected: call connect() before using the API")]
    NotConnected,

    /// Connect could not validate the server and token
    #[error("failed to connect to {base_url}: {message}")]
    ConnectionFailed {
        base_url: String,
        message: String,
        #[source]
        source: Option<TransportError>,
    },

    /// The health check itself failed after a request error
    #[error("server unreachable: {message}")]
    ServerUnreachable { message: String },

    #[error("bad request (400): {message}")]
    BadRequest { message: String },

    #[error("unauthorized (401): check the access token: {message}")]
    Unauthorized { message: String },

    #[error("not found (404): {message}")]
    NotFound { message: String },

    #[error("method not allowed (405): {message}")]
    MethodNotAllowed { message: String },

    /// Any other failure while the server is alive
    #[error("request failed{}: {message}", status_suffix(status))]
    Unknown { status: Option<u16>, message: String },

    /// Local write error while saving a download; never health-checked
    #[error("failed to write {}: {source}", destination(path))]
    Io {
        /// Target file, absent when streaming into a caller's writer
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

fn destination(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "response body".to_string(),
    }
}

/// Fieldless mirror of [`ClientError`] for matching and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotConnected,
    ConnectionFailed,
    ServerUnreachable,
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    Unknown,
    Io,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ClientError::NotConnected => ErrorKind::NotConnected,
            ClientError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            ClientError::ServerUnreachable { .. } => ErrorKind::ServerUnreachable,
            ClientError::BadRequest { .. } => ErrorKind::BadRequest,
            ClientError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ClientError::NotFound { .. } => ErrorKind::NotFound,
            ClientError::MethodNotAllowed { .. } => ErrorKind::MethodNotAllowed,
            ClientError::Unknown { .. } => ErrorKind::Unknown,
            ClientError::Io { .. } => ErrorKind::Io,
        }
    }

    /// HTTP status of the failed call, when one was received
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::BadRequest { .. } => Some(400),
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::NotFound { .. } => Some(404),
            ClientError::MethodNotAllowed { .. } => Some(405),
            ClientError::Unknown { status, .. } => *status,
            _ => None,
        }
    }

    /// Map a failed call onto the status table
    ///
    /// Only meaningful once the health check has confirmed the server is up.
    pub(crate) fn from_status(status: Option<u16>, message: String) -> Self {
        match status {
            Some(400) => ClientError::BadRequest { message },
            Some(401) => ClientError::Unauthorized { message },
            Some(404) => ClientError::NotFound { message },
            Some(405) => ClientError::MethodNotAllowed { message },
            status => ClientError::Unknown { status, message },
        }
    }
}
