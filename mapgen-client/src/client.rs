//! HTTP client for the map generation service
//!
//! Wraps the provider's REST contract: lookup by size and seed, lookup by
//! job id, generation requests, and image downloads. Each call translates
//! the provider's status codes into a [`GenerationOutcome`] or a typed
//! error; anything outside the documented contract is surfaced as
//! [`Error::Provider`].

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::types::{
    DownloadedImage, GenerationOutcome, MapMetadata, WorldIdentifier, extension_for_mime,
    extract_job_id,
};
use crate::{Error, Result};

/// Default base URL of the generation service
const DEFAULT_BASE_URL: &str = "https://api.worldmaps.dev/v2";

/// Header carrying the API key
const API_KEY_HEADER: &str = "X-API-Key";

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Client for the map generation service
#[derive(Debug, Clone)]
pub struct MapApiClient {
    /// HTTP client with connection pooling
    client: Client,
    /// Base URL, overridable for tests and self-hosted providers
    base_url: String,
    /// API key sent with every provider request
    api_key: String,
    /// Custom user agent string
    user_agent: Option<String>,
}

impl MapApiClient {
    /// Create a new client with default configuration
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(client, api_key))
    }

    /// Create a new client from an existing reqwest client
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            user_agent: None,
        }
    }

    /// Override the provider base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set a custom user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Get the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configured API key, or `MissingCredential` when empty
    pub(crate) fn require_credential(&self) -> Result<&str> {
        if self.api_key.is_empty() {
            return Err(Error::MissingCredential);
        }
        Ok(&self.api_key)
    }

    /// Attach common headers to a provider request
    fn provider_request(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let key = self.require_credential()?;
        let mut request = request.header(API_KEY_HEADER, key);
        if let Some(ref user_agent) = self.user_agent {
            request = request.header("User-Agent", user_agent);
        }
        Ok(request)
    }

    /// Send a request, racing it against the cancellation signal
    async fn send(&self, request: RequestBuilder, cancel: &CancellationToken) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            response = request.send() => Ok(response?),
        }
    }

    /// Look up a map by its world size and seed
    ///
    /// This is the authoritative identification path: it is keyed by the
    /// caller's actual request and idempotent on the provider side.
    pub async fn lookup_by_size_seed(
        &self,
        world: &WorldIdentifier,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let mut url = format!("{}/maps/{}/{}", self.base_url, world.size, world.seed);
        if world.staging {
            url.push_str("?staging=true");
        }

        debug!("Looking up map for size {} seed {}", world.size, world.seed);
        let request = self.provider_request(self.client.get(&url))?;
        let response = self.send(request, cancel).await?;
        lookup_outcome(response).await
    }

    /// Look up a map by the provider job id
    ///
    /// A 409 here may carry a rotated job id when the provider restarted
    /// the generation under a new identifier.
    pub async fn lookup_by_id(
        &self,
        map_id: &str,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let url = format!("{}/maps/{}", self.base_url, map_id);

        debug!("Looking up map by id {}", map_id);
        let request = self.provider_request(self.client.get(&url))?;
        let response = self.send(request, cancel).await?;
        lookup_outcome(response).await
    }

    /// Ask the provider to generate a map for the given world
    pub async fn request_generation(
        &self,
        world: &WorldIdentifier,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let url = format!("{}/maps", self.base_url);
        let body = serde_json::json!({
            "size": world.size,
            "seed": world.seed,
            "staging": world.staging,
        });

        debug!(
            "Requesting generation for size {} seed {}",
            world.size, world.seed
        );
        let request = self.provider_request(self.client.post(&url).json(&body))?;
        let response = self.send(request, cancel).await?;

        let status = response.status();
        trace!("Generation request status: {}", status);
        match status {
            StatusCode::OK => Ok(GenerationOutcome::Exists),
            StatusCode::CREATED => Ok(GenerationOutcome::Queued(body_job_id(response).await)),
            StatusCode::CONFLICT => Ok(GenerationOutcome::Pending(body_job_id(response).await)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
            status => Err(Error::Provider { status }),
        }
    }

    /// Download the map image, trying each candidate URL in priority order
    ///
    /// The first successful response wins. Failed candidates are remembered
    /// and reported in the aggregated [`Error::ImageFetch`] when every URL
    /// fails. Cancellation mid-request propagates as [`Error::Cancelled`],
    /// never as an aggregated fetch error.
    pub async fn download_image(
        &self,
        metadata: &MapMetadata,
        cancel: &CancellationToken,
    ) -> Result<DownloadedImage> {
        self.require_credential()?;

        let candidates = metadata.image_candidates();
        if candidates.is_empty() {
            return Err(Error::ImageFetch {
                attempts: 0,
                last_error: "metadata carries no image URLs".to_string(),
            });
        }

        let mut last_error = String::new();
        for url in &candidates {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            debug!("Fetching map image from {}", url);
            let mut request = self.client.get(*url);
            if let Some(ref user_agent) = self.user_agent {
                request = request.header("User-Agent", user_agent);
            }

            match self.send(request, cancel).await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        warn!("Image candidate {} returned status {}", url, status);
                        last_error = format!("{url} returned status {status}");
                        continue;
                    }

                    let mime = response
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    match response.bytes().await {
                        Ok(bytes) => {
                            trace!("Downloaded {} bytes from {}", bytes.len(), url);
                            return Ok(DownloadedImage {
                                bytes,
                                extension: extension_for_mime(&mime),
                                mime,
                                source_url: (*url).to_string(),
                            });
                        }
                        Err(e) => {
                            warn!("Reading image body from {} failed: {}", url, e);
                            last_error = format!("{url}: {e}");
                        }
                    }
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(Error::Http(e)) => {
                    warn!("Image candidate {} failed: {}", url, e);
                    last_error = format!("{url}: {e}");
                }
                Err(other) => return Err(other),
            }
        }

        Err(Error::ImageFetch {
            attempts: candidates.len(),
            last_error,
        })
    }
}

/// Translate a lookup response into a generation outcome
async fn lookup_outcome(response: Response) -> Result<GenerationOutcome> {
    let status = response.status();
    trace!("Lookup status: {}", status);
    match status {
        StatusCode::OK => {
            let body: serde_json::Value = response.json().await?;
            MapMetadata::from_response(body)
                .map(GenerationOutcome::Ready)
                .ok_or(Error::InvalidResponse)
        }
        StatusCode::NOT_FOUND => Ok(GenerationOutcome::NotFound),
        StatusCode::CONFLICT => Ok(GenerationOutcome::Generating(body_job_id(response).await)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
        status => Err(Error::Provider { status }),
    }
}

/// Best-effort job id extraction from a response body
async fn body_job_id(response: Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    extract_job_id(&body)
}
