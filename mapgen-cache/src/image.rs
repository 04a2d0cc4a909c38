//! Image store: one binary map render per cached key
//!
//! A key's image may exist under any of the known extensions, written by
//! different provider responses over time. At most one file is canonical;
//! leftovers from earlier runs stay on disk until a sweep removes paths
//! the caller no longer references.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::paths::CachePaths;
use crate::{Result, ensure_dir};

/// Known image extensions, in probe priority order
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// A cached image file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    /// Location of the image file
    pub path: PathBuf,
    /// Extension the file was stored under
    pub extension: String,
}

/// Store for cached map images
#[derive(Debug)]
pub struct ImageStore {
    paths: Arc<CachePaths>,
}

impl ImageStore {
    /// Create a store resolving paths through the shared resolver
    pub fn new(paths: Arc<CachePaths>) -> Self {
        Self { paths }
    }

    /// Find the cached image for a key
    ///
    /// Probes the known extensions in priority order and returns the first
    /// file that exists.
    pub async fn find(&self, key: &str) -> Option<CachedImage> {
        for extension in IMAGE_EXTENSIONS {
            let path = self.paths.image_path(key, extension);
            if tokio::fs::metadata(&path).await.is_ok() {
                return Some(CachedImage {
                    path,
                    extension: extension.to_string(),
                });
            }
        }
        None
    }

    /// Persist image content for a key under the given extension
    pub async fn save(&self, key: &str, extension: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.paths.image_path(key, extension);
        if let Some(parent) = path.parent() {
            ensure_dir(parent).await?;
        }

        trace!("Writing {} image bytes for key {}", content.len(), key);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    /// Delete every image file whose path is not in the active set
    ///
    /// Operates over literal file paths because the caller knows which
    /// exact files are still referenced, including stale extensions. The
    /// error posture matches the metadata sweep: absent root is a no-op,
    /// other directory failures abort, per-file failures are logged.
    pub async fn sweep(&self, active_paths: &HashSet<PathBuf>) -> Result<()> {
        let root = self.paths.image_root();
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                warn!("Sweeping image cache {:?} aborted: {}", root, e);
                return Err(e.into());
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() || active_paths.contains(&path) {
                continue;
            }

            trace!("Sweeping unreferenced image {:?}", path);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Could not delete {:?} during sweep: {}", path, e);
            }
        }

        Ok(())
    }
}
