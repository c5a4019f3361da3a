//! Error types for scout-data
//!
//! Both enums are `Clone + PartialEq` so they can be stored inside [`State`](crate::state::State)
//! and compared by the hook layer when deciding whether to re-render.

use thiserror::Error;

use crate::key::Resource;

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failures reported by the remote data service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Unauthorized - API key missing or expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::truncate_body(body);
        match status {
            401 => ServiceError::Unauthorized,
            403 => ServiceError::AccessDenied(message),
            500..=599 => ServiceError::Server { status, message },
            _ => ServiceError::Rejected { status, message },
        }
    }
}

#[cfg(feature = "postgrest")]
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::InvalidResponse(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::InvalidResponse(err.to_string())
    }
}

/// Errors surfaced by queries and mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A by-id lookup completed but no fetched row carried the requested id.
    #[error("{resource} record not found: {id}")]
    NotFound { resource: Resource, id: String },

    /// The remote data service call itself failed.
    #[error(transparent)]
    Upstream(#[from] ServiceError),
}

impl QueryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound { .. })
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
pub type QueryResult<T> = Result<T, QueryError>;
