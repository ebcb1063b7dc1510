//! Error types shared by the matching engine, the upload path and the API.

use thiserror::Error;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required parameter is missing or malformed
    #[error("{message}")]
    Validation { message: String },

    /// The subject student could not be resolved
    #[error("{message}")]
    NotFound { message: String },

    /// The write would duplicate an existing record
    #[error("{message}")]
    Conflict { message: String },

    /// The caller exceeded the rate limit for this scope
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    /// The uploaded calendar could not be decoded
    #[error("Failed to parse calendar: {message}")]
    Calendar { message: String },

    /// The store failed to answer
    #[error("Database error: {0}")]
    Dependency(#[from] rusqlite::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound {
            message: message.into(),
        }
    }

    /// Returns true if the error was caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ServiceError::Dependency(_))
    }
}
