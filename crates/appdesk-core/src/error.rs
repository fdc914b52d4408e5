//! Error types for appdesk.
//!
//! API operations fail with a single shape, [`NormalizedError`]. The
//! remaining enums describe failures of the collaborators the client is
//! built from (transport, token storage, input parsing) before they are
//! normalized.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Classification of a [`NormalizedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was received from the server.
    Network,
    /// The server rejected the access token (HTTP 401 or 403).
    Authorization,
    /// The server rejected the request payload field by field.
    Validation,
    /// Any other non-success response, or an undecodable success body.
    Server,
}

impl ErrorKind {
    /// Classify a failure by its HTTP status alone.
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => ErrorKind::Network,
            401 | 403 => ErrorKind::Authorization,
            400 | 422 => ErrorKind::Validation,
            _ => ErrorKind::Server,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
        };
        f.write_str(name)
    }
}

/// The uniform failure value surfaced by every API operation.
///
/// `status` is 0 when no response was received. `field_errors` is present
/// only for structured validation rejections; `payload` keeps the raw JSON
/// body when the server sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedError {
    kind: ErrorKind,
    status: u16,
    message: String,
    field_errors: Option<BTreeMap<String, Vec<String>>>,
    payload: Option<serde_json::Value>,
}

impl NormalizedError {
    /// Create a new normalized error.
    pub fn new(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            field_errors: None,
            payload: None,
        }
    }

    /// Create an error for a request that never received a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, 0, message)
    }

    /// Attach per-field validation messages.
    pub fn with_field_errors(mut self, field_errors: BTreeMap<String, Vec<String>>) -> Self {
        self.field_errors = Some(field_errors);
        self
    }

    /// Attach the raw JSON body of the failed response.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        self.field_errors.as_ref()
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    /// Check if this error means the session can no longer be used.
    pub fn is_authorization(&self) -> bool {
        self.kind == ErrorKind::Authorization || self.status == 401 || self.status == 403
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == 0 {
            write!(f, "{} error: {}", self.kind, self.message)
        } else {
            write!(f, "HTTP {}: {}", self.status, self.message)
        }
    }
}

impl std::error::Error for NormalizedError {}

/// Failures where no HTTP response was received.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The HTTP client could not be constructed.
    #[error("HTTP client unavailable: {message}")]
    Client { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Token storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the storage file failed.
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage file exists but could not be parsed.
    #[error("storage file {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Serializing the storage contents failed.
    #[error("failed to encode storage: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Unknown resource collection name.
    #[error("unknown resource '{value}' (expected one of: {expected})")]
    Resource { value: String, expected: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
