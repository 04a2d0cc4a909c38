//! Error types for the map generation client

use std::time::Duration;

use thiserror::Error;

/// Result type for map generation client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for map lookup, generation and image download
#[derive(Debug, Error)]
pub enum Error {
    /// No API key was configured for the generation service
    #[error("map generation API key is not configured")]
    MissingCredential,

    /// The world identifier failed validation before any request was made
    #[error("invalid world parameters: {reason}")]
    InvalidParameters { reason: String },

    /// The generation service rejected the configured API key
    ///
    /// Always fatal: retrying against a bad credential cannot succeed.
    #[error("map generation API rejected the configured key")]
    Unauthorized,

    /// No generated map exists for the requested world
    ///
    /// Only returned to callers that opted out of waiting for generation.
    #[error("no generated map exists for size {size} seed {seed}")]
    NotFound { size: u32, seed: i64 },

    /// Generation is still in progress
    ///
    /// Only returned to callers that opted out of waiting for generation.
    #[error("map generation is still pending")]
    GenerationPending,

    /// The deadline elapsed while waiting for generation to finish
    #[error("map generation did not finish within {timeout:?}")]
    GenerationTimeout { timeout: Duration },

    /// The generation service returned a status outside its documented contract
    #[error("map generation API returned unexpected status {status}")]
    Provider { status: reqwest::StatusCode },

    /// The generation service returned a body that could not be parsed
    #[error("map generation API returned an unparseable response")]
    InvalidResponse,

    /// Every candidate image URL failed
    #[error("all {attempts} candidate image URLs failed, last error: {last_error}")]
    ImageFetch { attempts: usize, last_error: String },

    /// The external cancellation signal fired
    #[error("map resolution was cancelled")]
    Cancelled,

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create an invalid parameters error
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }
}
