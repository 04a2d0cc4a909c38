//! Cache path resolution

use std::path::PathBuf;

use parking_lot::RwLock;

use crate::{Result, ensure_dir, get_cache_dir};

/// The two configurable cache root directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRoots {
    /// Directory holding one JSON metadata record per key
    pub metadata_root: PathBuf,
    /// Directory holding one image file per key
    pub image_root: PathBuf,
}

impl CacheRoots {
    /// Create roots from explicit directories
    pub fn new(metadata_root: impl Into<PathBuf>, image_root: impl Into<PathBuf>) -> Self {
        Self {
            metadata_root: metadata_root.into(),
            image_root: image_root.into(),
        }
    }

    /// Default roots under the platform cache directory
    pub fn default_roots() -> Result<Self> {
        let base = get_cache_dir()?;
        Ok(Self {
            metadata_root: base.join("meta"),
            image_root: base.join("images"),
        })
    }
}

/// Maps cache keys to on-disk metadata and image locations
///
/// The roots sit behind a lock so a configuration reload can swap them at
/// runtime; every call issued after [`CachePaths::set_roots`] resolves
/// against the new directories.
#[derive(Debug)]
pub struct CachePaths {
    roots: RwLock<CacheRoots>,
}

impl CachePaths {
    /// Create a resolver over the given roots
    pub fn new(roots: CacheRoots) -> Self {
        Self {
            roots: RwLock::new(roots),
        }
    }

    /// Create a resolver over the platform default roots
    pub fn with_default_roots() -> Result<Self> {
        Ok(Self::new(CacheRoots::default_roots()?))
    }

    /// Swap both roots, affecting all subsequent calls
    pub fn set_roots(&self, roots: CacheRoots) {
        *self.roots.write() = roots;
    }

    /// Current metadata root directory
    pub fn metadata_root(&self) -> PathBuf {
        self.roots.read().metadata_root.clone()
    }

    /// Current image root directory
    pub fn image_root(&self) -> PathBuf {
        self.roots.read().image_root.clone()
    }

    /// On-disk location of the metadata record for a key
    pub fn metadata_path(&self, key: &str) -> PathBuf {
        self.roots.read().metadata_root.join(format!("{key}.json"))
    }

    /// On-disk location of the image file for a key and extension
    pub fn image_path(&self, key: &str, extension: &str) -> PathBuf {
        self.roots
            .read()
            .image_root
            .join(format!("{key}.{extension}"))
    }

    /// Idempotently create both root directories
    pub async fn ensure(&self) -> Result<()> {
        let (metadata_root, image_root) = {
            let roots = self.roots.read();
            (roots.metadata_root.clone(), roots.image_root.clone())
        };
        ensure_dir(&metadata_root).await?;
        ensure_dir(&image_root).await?;
        Ok(())
    }
}
