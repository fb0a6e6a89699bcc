//! Error types for the AllAnime scraper
//!
//! Provides a comprehensive error enum with human-readable messages.

use thiserror::Error;

/// Error type for all AllAnime scraper operations
#[derive(Error, Debug)]
pub enum AnimineError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned a response we could not interpret
    #[error("Unexpected API response: {0}")]
    ApiError(String),

    /// Obfuscated source URL could not be decoded
    #[error("Failed to decode source URL: {0}")]
    DecodeError(String),

    /// Rate limited by server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Show or episode not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid query or identifier provided by the caller
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type alias for AllAnime scraper operations
pub type Result<T> = std::result::Result<T, AnimineError>;
