//! Media store upload client
//!
//! Media Ingestion Adapter for the identification pipeline. Posts the
//! image bytes as a multipart form to the configured media store and
//! returns the stable URL plus the provider's opaque object id. The
//! outcome is atomic: either the image is stored and addressable, or the
//! attempt failed. No partial-upload state is modeled.

use std::time::Duration;

use tracing::{debug, info};

use crate::types::{ImageIngestor, IngestError, UploadedImage};

/// Default timeout for upload requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// User-Agent header for media store requests
const USER_AGENT: &str = "Arbor/0.1.0 (https://github.com/arbor-project/arbor)";

/// Folder namespace uploads are grouped under
const UPLOAD_FOLDER: &str = "plant-identification";

/// Media store upload client
pub struct MediaStoreClient {
    http_client: reqwest::Client,
    upload_url: String,
}

impl MediaStoreClient {
    pub fn new(upload_url: String) -> Result<Self, IngestError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| IngestError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            upload_url,
        })
    }
}

#[async_trait::async_trait]
impl ImageIngestor for MediaStoreClient {
    async fn upload(&self, bytes: Vec<u8>, mime: &str) -> Result<UploadedImage, IngestError> {
        debug!(
            size_bytes = bytes.len(),
            mime = %mime,
            "Uploading image to media store"
        );

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name("upload")
            .mime_str(mime)
            .map_err(|e| IngestError::Transport(format!("Invalid MIME type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("folder", UPLOAD_FOLDER);

        let response = self
            .http_client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IngestError::Transport(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let uploaded: UploadedImage = response
            .json()
            .await
            .map_err(|e| IngestError::MalformedResponse(e.to_string()))?;

        if uploaded.url.is_empty() {
            return Err(IngestError::MalformedResponse(
                "Media store returned an empty URL".to_string(),
            ));
        }

        info!(url = %uploaded.url, object_id = %uploaded.object_id, "Image upload complete");

        Ok(uploaded)
    }
}
