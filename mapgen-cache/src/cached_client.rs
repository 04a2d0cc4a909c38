//! Cached wrapper for the map generation client
//!
//! Read-through layer combining the provider client with both cache
//! tiers: metadata records are served from disk while they are fresh
//! relative to the current reset point, images are downloaded once and
//! re-used from disk afterwards. Persistence failures degrade to
//! warnings; the resolved result stays valid either way.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mapgen_client::{MapApiClient, ResolveOptions, WorldIdentifier};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::image::{CachedImage, ImageStore};
use crate::key::sanitize_key;
use crate::metadata::{CachedMap, MetadataStore};
use crate::paths::{CachePaths, CacheRoots};
use crate::schedule::{ResetScheduler, next_reset_point};
use crate::Result;

/// A caching wrapper around [`MapApiClient`]
#[derive(Debug)]
pub struct CachedMapClient {
    /// The underlying provider client
    client: MapApiClient,
    /// Shared path resolver for both stores
    paths: Arc<CachePaths>,
    /// Metadata tier
    metadata: MetadataStore,
    /// Image tier
    images: ImageStore,
    /// At-most-once-per-window purge state
    scheduler: ResetScheduler,
}

impl CachedMapClient {
    /// Create a cached client over explicit cache roots
    pub fn new(client: MapApiClient, roots: CacheRoots) -> Self {
        let paths = Arc::new(CachePaths::new(roots));
        Self {
            metadata: MetadataStore::new(Arc::clone(&paths)),
            images: ImageStore::new(Arc::clone(&paths)),
            scheduler: ResetScheduler::new(),
            client,
            paths,
        }
    }

    /// Create a cached client over the platform default roots
    pub fn with_default_roots(client: MapApiClient) -> Result<Self> {
        Ok(Self::new(client, CacheRoots::default_roots()?))
    }

    /// Access the underlying provider client
    pub fn inner(&self) -> &MapApiClient {
        &self.client
    }

    /// Access the metadata tier
    pub fn metadata_store(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Access the image tier
    pub fn image_store(&self) -> &ImageStore {
        &self.images
    }

    /// Swap the cache roots at runtime (configuration reload)
    pub fn set_cache_roots(&self, roots: CacheRoots) {
        self.paths.set_roots(roots);
    }

    /// Cache key a world is stored under
    pub fn cache_key(world: &WorldIdentifier) -> String {
        sanitize_key(&world.raw_label())
    }

    /// Resolve map metadata, serving fresh cached records from disk
    ///
    /// A cached record survives until the wipe boundary passes; after
    /// that the provider is asked again and the record is overwritten
    /// wholesale. A failed save is logged and the freshly resolved
    /// record returned anyway.
    pub async fn resolve_map(
        &self,
        world: &WorldIdentifier,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Result<CachedMap> {
        self.resolve_map_at(world, options, cancel, Utc::now()).await
    }

    /// Clock-injectable variant of [`CachedMapClient::resolve_map`]
    ///
    /// Staleness is judged against the reset point current at `now`.
    pub async fn resolve_map_at(
        &self,
        world: &WorldIdentifier,
        options: &ResolveOptions,
        cancel: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Result<CachedMap> {
        let key = Self::cache_key(world);

        if let Some(cached) = self.metadata.load(&key).await {
            if !cached.is_stale(now, next_reset_point(now)) {
                debug!("Cache hit for map {}", key);
                return Ok(cached);
            }
            debug!("Cached map {} is stale, refetching", key);
        }

        let map = self.client.resolve_map(world, options, cancel).await?;
        let record = CachedMap {
            key: key.clone(),
            map,
            cached_at: None,
        };

        match self.metadata.save(record.clone()).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                warn!("Persisting metadata for {} failed: {}", key, e);
                Ok(CachedMap {
                    cached_at: Some(now),
                    ..record
                })
            }
        }
    }

    /// Fetch the map image for a record, downloading it once
    ///
    /// Serves the cached file when one exists under any known extension;
    /// otherwise downloads across the record's candidate URLs and
    /// persists the result.
    pub async fn fetch_image(
        &self,
        record: &CachedMap,
        cancel: &CancellationToken,
    ) -> Result<CachedImage> {
        if let Some(image) = self.images.find(&record.key).await {
            debug!("Image cache hit for map {}", record.key);
            return Ok(image);
        }

        let downloaded = self.client.download_image(&record.map, cancel).await?;
        let path = self
            .images
            .save(&record.key, downloaded.extension, &downloaded.bytes)
            .await?;

        Ok(CachedImage {
            path,
            extension: downloaded.extension.to_string(),
        })
    }

    /// Run the scheduled purge when the current reset point has passed
    ///
    /// `active_keys` and `active_paths` enumerate everything still
    /// referenced by tracked servers; anything else is swept. Returns
    /// whether a purge ran.
    pub async fn purge_if_due(
        &self,
        now: DateTime<Utc>,
        active_keys: &HashSet<String>,
        active_paths: &HashSet<PathBuf>,
    ) -> Result<bool> {
        self.scheduler
            .purge_if_due(
                next_reset_point(now),
                now,
                active_keys,
                active_paths,
                &self.metadata,
                &self.images,
            )
            .await
    }
}
