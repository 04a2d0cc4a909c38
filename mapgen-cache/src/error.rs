//! Error types for the map cache

use thiserror::Error;

/// Result type for map cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug, Error)]
pub enum Error {
    /// Cache directory could not be determined
    #[error("could not determine a cache directory for the current platform")]
    CacheDirectoryNotFound,

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Map generation client error
    #[error("map client error: {0}")]
    Client(#[from] mapgen_client::Error),
}
