//! Error types for the Beaker client core.
//!
//! # Design
//! `ApiError` is the decoded body of any response with status >= 400 and is a
//! complete error on its own. Everything else the core can fail with lands in
//! `ClientError`, which callers match on to tell configuration mistakes,
//! transport trouble, server rejections and decode failures apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error document returned by the service for failed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} ({code})")]
pub struct ApiError {
    /// HTTP status echoed by the server. Zero when the server omitted it.
    #[serde(default)]
    pub code: u16,
    pub message: String,
}

/// Failure of the underlying HTTP round-trip, before any status was seen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure, timeout. Worth retrying.
    #[error("network error: {0}")]
    Network(String),

    /// The request itself cannot be sent as built. Never retried.
    #[error("request error: {0}")]
    Request(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client could not be constructed from the given configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server rejected the request with a structured error body.
    /// `status` is the HTTP status of the response, whatever `error.code` says.
    #[error("{error}")]
    Api { status: u16, error: ApiError },

    /// The server rejected the request and its body was not an error document.
    #[error("failed to parse error response (HTTP {status}): {body}")]
    UnparseableError { status: u16, body: String },

    /// A success response did not hold the expected JSON.
    #[error("failed to decode response: {source}: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// A name-or-ID reference did not map to any object.
    #[error("could not resolve {kind} {reference:?}: {source}")]
    Resolve {
        kind: &'static str,
        reference: String,
        #[source]
        source: Box<ClientError>,
    },

    /// A reference that cannot name any object, such as an empty string.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("token not found in response")]
    TokenNotFound,

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl ClientError {
    /// HTTP status attached to the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::UnparseableError { status, .. } => Some(*status),
            ClientError::Resolve { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether the error means the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
