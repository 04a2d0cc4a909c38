//! Request and response types for the map generation service

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Smallest world size the generation service accepts
pub const MIN_WORLD_SIZE: u32 = 1000;

/// Largest world size the generation service accepts
pub const MAX_WORLD_SIZE: u32 = 6000;

/// Seeds are non-negative 32-bit values on the provider side
pub const MAX_WORLD_SEED: i64 = i32::MAX as i64;

/// The (size, seed, staging) triple identifying a procedurally generated world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldIdentifier {
    /// World size in map units
    pub size: u32,
    /// Procedural generation seed
    pub seed: i64,
    /// Whether the world runs on the staging branch of the game
    pub staging: bool,
}

impl WorldIdentifier {
    /// Create an identifier for a release-branch world
    pub fn new(size: u32, seed: i64) -> Self {
        Self {
            size,
            seed,
            staging: false,
        }
    }

    /// Create an identifier for a staging-branch world
    pub fn staging(size: u32, seed: i64) -> Self {
        Self {
            size,
            seed,
            staging: true,
        }
    }

    /// Check that size and seed are within the ranges the provider accepts
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WORLD_SIZE..=MAX_WORLD_SIZE).contains(&self.size) {
            return Err(Error::invalid_parameters(format!(
                "size {} is outside {MIN_WORLD_SIZE}..={MAX_WORLD_SIZE}",
                self.size
            )));
        }
        if !(0..=MAX_WORLD_SEED).contains(&self.seed) {
            return Err(Error::invalid_parameters(format!(
                "seed {} is outside 0..={MAX_WORLD_SEED}",
                self.seed
            )));
        }
        Ok(())
    }

    /// Raw label this world is cached under, before sanitization
    pub fn raw_label(&self) -> String {
        if self.staging {
            format!("{}-{}-staging", self.size, self.seed)
        } else {
            format!("{}-{}", self.size, self.seed)
        }
    }
}

/// Descriptive metadata for a generated map, as returned by the provider
///
/// Every field except the job id is optional on the wire; missing fields
/// deserialize to their defaults so that partially filled responses from
/// older provider versions still parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapMetadata {
    /// Provider job id for this map
    pub id: String,
    /// Map type reported by the provider (e.g. procedural, custom)
    #[serde(rename = "type")]
    pub map_type: Option<String>,
    /// Procedural generation seed
    pub seed: i64,
    /// World size in map units
    pub size: u32,
    /// Game save version the map was generated against
    pub save_version: Option<i64>,
    /// Human-readable display name
    pub name: Option<String>,
    /// Direct download URL for the rendered map image
    pub download_url: Option<String>,
    /// Full-resolution image URL
    pub image_url: Option<String>,
    /// Unannotated image URL
    pub raw_image_url: Option<String>,
    /// Icon-sized image URL (never used for downloads)
    pub image_icon_url: Option<String>,
    /// Thumbnail image URL
    pub thumbnail_url: Option<String>,
    /// Whether this is a hand-made custom map
    pub is_custom_map: bool,
    /// Whether the provider allows downloading the map file
    pub can_download: bool,
    /// Number of monuments on the map
    pub total_monuments: Option<u32>,
    /// Per-monument statistics, passed through untyped for dashboards
    pub monuments: Option<serde_json::Value>,
    /// Biome coverage statistics, passed through untyped for dashboards
    pub biome_percentages: Option<serde_json::Value>,
}

impl MapMetadata {
    /// Parse a provider response body into metadata
    ///
    /// Accepts both a bare object and the `{"data": {...}}` envelope newer
    /// provider versions wrap responses in. Returns `None` when the body is
    /// not an object, a present field has the wrong type, or the invariants
    /// (non-empty id, plausible size and seed) do not hold.
    pub fn from_response(value: serde_json::Value) -> Option<Self> {
        let body = match value {
            serde_json::Value::Object(mut map) => match map.remove("data") {
                Some(inner @ serde_json::Value::Object(_)) => inner,
                Some(_) => return None,
                None => serde_json::Value::Object(map),
            },
            _ => return None,
        };

        let meta: Self = serde_json::from_value(body).ok()?;
        if meta.id.is_empty() || meta.size == 0 || meta.seed < 0 {
            return None;
        }
        Some(meta)
    }

    /// Candidate image URLs in download priority order
    ///
    /// Non-empty URLs only, de-duplicated, ordered download > full image >
    /// raw image > thumbnail. The icon URL is metadata-only and never a
    /// download candidate.
    pub fn image_candidates(&self) -> Vec<&str> {
        let mut candidates = Vec::new();
        for url in [
            &self.download_url,
            &self.image_url,
            &self.raw_image_url,
            &self.thumbnail_url,
        ]
        .into_iter()
        .flatten()
        {
            let url = url.as_str();
            if !url.is_empty() && !candidates.contains(&url) {
                candidates.push(url);
            }
        }
        candidates
    }

    /// Whether at least one usable image URL is present
    pub fn has_image_candidate(&self) -> bool {
        !self.image_candidates().is_empty()
    }
}

/// Extract a job id from a conflict/queued response body, if one is present
///
/// The provider is inconsistent about the field name across endpoints, so
/// both `mapId` and `id` are accepted, at the top level or inside a `data`
/// envelope.
pub(crate) fn extract_job_id(value: &serde_json::Value) -> Option<String> {
    let candidates = [
        value.get("mapId"),
        value.get("id"),
        value.get("data").and_then(|d| d.get("mapId")),
        value.get("data").and_then(|d| d.get("id")),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Outcome of a single lookup or generation request against the provider
///
/// Consumed inside the resolve loop only, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The map exists and its metadata was parsed
    Ready(MapMetadata),
    /// No map exists for the requested identifier
    NotFound,
    /// Generation is running; the provider may have reported a job id
    Generating(Option<String>),
    /// A new generation job was accepted
    Queued(Option<String>),
    /// A generation job already existed for this world
    Pending(Option<String>),
    /// The map already existed, no new job was created
    Exists,
}

/// A downloaded map image with its detected format
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    /// Raw image content
    pub bytes: Bytes,
    /// File extension derived from the response MIME type
    pub extension: &'static str,
    /// MIME type reported by the server
    pub mime: String,
    /// Candidate URL the content was fetched from
    pub source_url: String,
}

/// Map a Content-Type header value to a file extension
///
/// Unknown or missing types fall back to `jpg`.
pub(crate) fn extension_for_mime(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or_default().trim() {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/jpeg" => "jpeg",
        _ => "jpg",
    }
}
