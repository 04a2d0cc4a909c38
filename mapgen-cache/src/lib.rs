//! Persistent cache for generated map assets
//!
//! Two flat directory tiers keyed by sanitized world labels:
//! - Metadata: one JSON record per key with the provider's map description
//! - Images: one binary file per key with a detected extension
//!
//! Eviction follows the game's wipe schedule: entries cached before the
//! current reset point are stale once the reset point has passed, and a
//! scheduled purge sweeps out entries no tracked server references
//! anymore. Cache corruption never propagates to callers; a broken entry
//! reads as a miss.

use std::path::{Path, PathBuf};

pub mod cached_client;
pub mod error;
pub mod image;
pub mod key;
pub mod metadata;
pub mod paths;
pub mod schedule;

pub use cached_client::CachedMapClient;
pub use error::{Error, Result};
pub use image::{CachedImage, IMAGE_EXTENSIONS, ImageStore};
pub use key::sanitize_key;
pub use metadata::{CachedMap, MetadataStore};
pub use paths::{CachePaths, CacheRoots};
pub use schedule::{ResetScheduler, is_stale, next_reset_point};

/// Get the base cache directory for map assets
///
/// Returns a path like:
/// - Linux: `~/.cache/mapgen`
/// - macOS: `~/Library/Caches/mapgen`
/// - Windows: `C:\Users\{user}\AppData\Local\mapgen`
pub fn get_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .ok_or(Error::CacheDirectoryNotFound)
        .map(|dir| dir.join("mapgen"))
}

/// Ensure a directory exists, creating it if necessary
pub(crate) async fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if tokio::fs::metadata(path).await.is_err() {
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}
