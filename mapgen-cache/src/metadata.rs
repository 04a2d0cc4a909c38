//! Metadata store: one JSON record per cached map
//!
//! Records are plain JSON files named `{key}.json` under the metadata
//! root. Read problems never escalate past a warning; a record that
//! cannot be read or parsed is a cache miss, so a corrupt cache heals
//! itself on the next successful fetch.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mapgen_client::MapMetadata;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::paths::CachePaths;
use crate::{Result, ensure_dir};

/// A cached map record as persisted on disk
///
/// The provider metadata is flattened so the file is the metadata shape
/// plus `key` and `cachedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedMap {
    /// Sanitized cache key this record is stored under
    pub key: String,
    /// Provider metadata for the map
    #[serde(flatten)]
    pub map: MapMetadata,
    /// When this record was cached; filled in on save when absent
    pub cached_at: Option<DateTime<Utc>>,
}

impl CachedMap {
    /// Whether a rotation boundary has passed since this record was cached
    ///
    /// Records cached after the boundary are fresh even when `now` is far
    /// past it. A record without a timestamp counts as stale.
    pub fn is_stale(&self, now: DateTime<Utc>, reset_point: DateTime<Utc>) -> bool {
        self.cached_at
            .is_none_or(|cached_at| crate::schedule::is_stale(cached_at, now, reset_point))
    }
}

/// Store for cached map metadata records
#[derive(Debug)]
pub struct MetadataStore {
    paths: Arc<CachePaths>,
}

impl MetadataStore {
    /// Create a store resolving paths through the shared resolver
    pub fn new(paths: Arc<CachePaths>) -> Self {
        Self { paths }
    }

    /// Load the record for a key
    ///
    /// An absent file is a plain miss. Any other read or parse failure is
    /// logged and also treated as a miss so corrupt entries never reach
    /// callers as errors.
    pub async fn load(&self, key: &str) -> Option<CachedMap> {
        let path = self.paths.metadata_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Reading cached metadata {:?} failed: {}", path, e);
                return None;
            }
        };

        match serde_json::from_slice::<CachedMap>(&raw) {
            Ok(record) => {
                trace!("Loaded cached metadata for key {}", key);
                Some(record)
            }
            Err(e) => {
                warn!("Cached metadata {:?} is corrupt, treating as miss: {}", path, e);
                None
            }
        }
    }

    /// Persist a record, defaulting `cached_at` to now when absent
    ///
    /// Creates parent directories as needed and returns the record as
    /// stored.
    pub async fn save(&self, mut record: CachedMap) -> Result<CachedMap> {
        if record.cached_at.is_none() {
            record.cached_at = Some(Utc::now());
        }

        let path = self.paths.metadata_path(&record.key);
        if let Some(parent) = path.parent() {
            ensure_dir(parent).await?;
        }

        let json = serde_json::to_vec_pretty(&record)?;
        trace!(
            "Writing {} bytes of metadata for key {}",
            json.len(),
            record.key
        );
        tokio::fs::write(&path, json).await?;

        Ok(record)
    }

    /// Delete the record for a key; removing a missing key is not an error
    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.paths.metadata_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                trace!("Removed cached metadata for key {}", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every record whose key is not in the active set
    ///
    /// An absent root directory is a no-op. Any other directory read
    /// failure aborts the sweep; failures deleting individual files are
    /// logged and skipped.
    pub async fn sweep(&self, active_keys: &HashSet<String>) -> Result<()> {
        let root = self.paths.metadata_root();
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                warn!("Sweeping metadata cache {:?} aborted: {}", root, e);
                return Err(e.into());
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if active_keys.contains(key) {
                continue;
            }

            trace!("Sweeping metadata for inactive key {}", key);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Could not delete {:?} during sweep: {}", path, e);
            }
        }

        Ok(())
    }
}
