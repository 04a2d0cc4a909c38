//! Map generation service client
//!
//! This crate talks to the third-party service that procedurally generates
//! game-world map images:
//! - Lookup by world size and seed, or by provider job id
//! - Generation requests with asynchronous job tracking
//! - A deadline-bound resolve loop that polls until a map is ready
//! - Image download across the candidate URLs a map advertises

pub mod client;
pub mod error;
pub mod resolver;
pub mod types;

pub use client::MapApiClient;
pub use error::{Error, Result};
pub use resolver::{
    DEFAULT_POLL_INTERVAL, DEFAULT_RESOLVE_TIMEOUT, MIN_RESOLVE_TIMEOUT, ResolveOptions,
};
pub use types::{
    DownloadedImage, GenerationOutcome, MAX_WORLD_SEED, MAX_WORLD_SIZE, MIN_WORLD_SIZE,
    MapMetadata, WorldIdentifier,
};
