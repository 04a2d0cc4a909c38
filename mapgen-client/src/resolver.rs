//! Deadline-bound map resolution
//!
//! Drives the provider's asynchronous generation protocol: look the map up
//! by size and seed, request generation at most once when it does not
//! exist, then poll until the map is ready or the deadline elapses. The
//! size/seed lookup is the source of truth; polling by job id only exists
//! to detect completion without waiting out a full interval, so failures
//! on that path are tolerated. An unauthorized response is fatal wherever
//! it is seen.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::types::{GenerationOutcome, MapMetadata, WorldIdentifier};
use crate::{Error, MapApiClient, Result};

/// Default overall resolve timeout
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(600);

/// Enforced lower bound on the resolve timeout
pub const MIN_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between provider polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Options controlling a resolve run
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Wait for generation to finish instead of failing fast
    pub wait: bool,
    /// Overall deadline for the run, clamped up to [`MIN_RESOLVE_TIMEOUT`]
    pub timeout: Duration,
    /// Interval between polls while waiting
    pub poll_interval: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            wait: true,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ResolveOptions {
    /// Options for callers that want an immediate answer without polling
    pub fn no_wait() -> Self {
        Self {
            wait: false,
            ..Self::default()
        }
    }
}

impl MapApiClient {
    /// Resolve metadata for a world, driving generation when needed
    ///
    /// Returns metadata as soon as the provider reports the map ready with
    /// at least one usable image URL. With `wait` disabled, the current
    /// provider state is returned or mapped to [`Error::NotFound`] /
    /// [`Error::GenerationPending`] without any polling.
    ///
    /// The cancellation token is honored at every suspension point: the
    /// start of each network call and the inter-poll sleep.
    pub async fn resolve_map(
        &self,
        world: &WorldIdentifier,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Result<MapMetadata> {
        world.validate()?;
        self.require_credential()?;

        let timeout = options.timeout.max(MIN_RESOLVE_TIMEOUT);
        let deadline = Instant::now() + timeout;
        let mut job_id: Option<String> = None;
        let mut generation_requested = false;

        loop {
            let outcome = self.lookup_by_size_seed(world, cancel).await?;

            if let GenerationOutcome::Ready(ref meta) = outcome {
                if meta.has_image_candidate() {
                    debug!(
                        "Map for size {} seed {} is ready with image",
                        world.size, world.seed
                    );
                    return Ok(meta.clone());
                }
            }

            if !options.wait {
                return match outcome {
                    GenerationOutcome::Ready(meta) => Ok(meta),
                    GenerationOutcome::NotFound => Err(Error::NotFound {
                        size: world.size,
                        seed: world.seed,
                    }),
                    _ => Err(Error::GenerationPending),
                };
            }

            match outcome {
                GenerationOutcome::Generating(Some(id)) => {
                    job_id = Some(id);
                }
                GenerationOutcome::NotFound if !generation_requested => {
                    match self.request_generation(world, cancel).await? {
                        GenerationOutcome::Queued(Some(id))
                        | GenerationOutcome::Pending(Some(id)) => {
                            debug!("Generation job {} accepted", id);
                            job_id = Some(id);
                        }
                        _ => {}
                    }
                    // One request per run, even if the provider keeps
                    // answering not-found afterwards.
                    generation_requested = true;
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(Error::GenerationTimeout { timeout });
            }

            if let Some(id) = job_id.clone() {
                match self.lookup_by_id(&id, cancel).await {
                    Ok(GenerationOutcome::Ready(meta)) if meta.has_image_candidate() => {
                        debug!("Job {} finished", id);
                        return Ok(meta);
                    }
                    Ok(GenerationOutcome::Ready(_)) => {}
                    Ok(GenerationOutcome::NotFound) => {
                        debug!("Job {} is no longer known, dropping it", id);
                        job_id = None;
                    }
                    Ok(GenerationOutcome::Generating(Some(new_id))) => {
                        if new_id != id {
                            debug!("Job {} rotated to {}", id, new_id);
                        }
                        job_id = Some(new_id);
                    }
                    Ok(_) => {}
                    Err(Error::Unauthorized) => return Err(Error::Unauthorized),
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(e) => warn!("Polling job {} failed: {}", id, e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::GenerationTimeout { timeout });
            }

            let interval = options.poll_interval.min(deadline - now);
            tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = sleep(interval) => {}
            }
        }
    }
}
