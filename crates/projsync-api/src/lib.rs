//! projsync API - Remote project document store client
//!
//! Provides an async HTTP client for:
//! - Listing the projects of an organization
//! - Listing, creating and deleting project documents
//!
//! ## Modules
//!
//! - [`client`] - Typed HTTP client with session cookie and endpoint construction
//! - [`provider`] - [`IRemoteDocumentStore`](projsync_core::ports::IRemoteDocumentStore) implementation

pub mod client;
pub mod provider;

use projsync_core::ports::RemoteError;
use thiserror::Error;

/// Errors that can occur when talking to the remote document store
#[derive(Debug, Error)]
pub enum ApiError {
    /// The session key is missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The session may not access the requested resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response body could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Status code carried by the error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) => None,
        }
    }
}

impl From<ApiError> for RemoteError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(body) => RemoteError::Unauthorized(body),
            ApiError::Forbidden(body) => RemoteError::Status { status: 403, body },
            ApiError::NotFound(body) => RemoteError::Status { status: 404, body },
            ApiError::Status { status, body } => RemoteError::Status { status, body },
            ApiError::NetworkError(e) if e.is_decode() => RemoteError::InvalidResponse(e.to_string()),
            ApiError::NetworkError(e) => RemoteError::Transport(e.to_string()),
            ApiError::InvalidResponse(msg) => RemoteError::InvalidResponse(msg),
        }
    }
}
