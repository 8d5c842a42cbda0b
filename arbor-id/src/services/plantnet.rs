//! PlantNet API client
//!
//! Classification Gateway for the identification pipeline. Sends one GET
//! request per call to the PlantNet identify endpoint with the uploaded
//! image URL and an organ hint; returns the raw provider response for the
//! normalizer. No retries and no backoff: a failed classification is
//! reported to the caller, and the upload result stands alone.
//!
//! # API Reference
//! - Endpoint: https://my-api.plantnet.org/v2/identify/all
//! - Query parameters: `images`, `organs`, `api-key`
//! - Rate limit: the provider enforces a daily request quota; responses
//!   echo `remainingIdentificationRequests`

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::services::normalizer::ProviderResponse;
use crate::types::{ClassificationError, SpeciesClassifier};

/// PlantNet API base URL
const PLANTNET_BASE_URL: &str = "https://my-api.plantnet.org";

/// Default timeout for identify requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum interval between requests (keeps bursts off the daily quota)
const RATE_LIMIT_MS: u64 = 500;

/// User-Agent header for provider requests
const USER_AGENT: &str = "Arbor/0.1.0 (https://github.com/arbor-project/arbor)";

/// Default organ hint when the caller does not supply one
pub const DEFAULT_ORGAN: &str = "leaf";

/// Minimum-interval rate limiter
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("PlantNet rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// PlantNet identification client
pub struct PlantNetClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PlantNetClient {
    pub fn new(api_key: String) -> Result<Self, ClassificationError> {
        Self::with_base_url(api_key, PLANTNET_BASE_URL.to_string())
    }

    /// Create a client against a non-default endpoint (testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ClassificationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClassificationError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
        })
    }

    async fn identify(
        &self,
        image_url: &str,
        organ: &str,
    ) -> Result<ProviderResponse, ClassificationError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/v2/identify/all", self.base_url);

        debug!(image_url = %image_url, organ = %organ, "Querying PlantNet");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("images", image_url),
                ("organs", organ),
                ("api-key", self.api_key.as_str()),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ClassificationError::Transport(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 401 {
            return Err(ClassificationError::InvalidApiKey);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::ProviderRejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let provider_response: ProviderResponse = response
            .json()
            .await
            .map_err(|e| ClassificationError::MalformedResponse(e.to_string()))?;

        if let Some(remaining) = provider_response.remaining_requests() {
            info!(remaining, "PlantNet identify complete");
        } else {
            info!("PlantNet identify complete");
        }

        Ok(provider_response)
    }
}

#[async_trait::async_trait]
impl SpeciesClassifier for PlantNetClient {
    async fn classify(
        &self,
        image_url: &str,
        organ: &str,
    ) -> Result<ProviderResponse, ClassificationError> {
        let organ = if organ.trim().is_empty() {
            DEFAULT_ORGAN
        } else {
            organ
        };
        self.identify(image_url, organ).await
    }
}
