//! Identification pipeline endpoints
//!
//! `POST /api/identify` runs the whole attempt (upload → classify →
//! normalize → record). The standalone `/api/upload-image` and
//! `/api/classify-image` routes expose the individual steps; the
//! classify-only route never touches the history ledger.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::services::normalizer;
use crate::services::plantnet::DEFAULT_ORGAN;
use crate::types::NormalizationError;
use crate::workflow::AttemptError;
use crate::AppState;

/// Upload size ceiling for image payloads (bytes)
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build identification routes
pub fn identify_routes() -> Router<AppState> {
    Router::new()
        .route("/api/identify", post(identify))
        .route("/api/upload-image", post(upload_image))
        .route("/api/classify-image", post(classify_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /api/identify
///
/// Runs one identification attempt to its terminal state. On failure the
/// response still carries the surviving upload facts, so "image uploaded"
/// and "classification failed" are reported as independent outcomes.
pub async fn identify(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let ImageUpload { bytes, mime, organ } = read_image_upload(multipart).await?;

    match state.orchestrator.run(bytes, &mime, &organ).await {
        Ok(done) => Ok((
            StatusCode::OK,
            Json(json!({
                "attempt_id": done.attempt_id,
                "upload": done.upload,
                "record": done.record,
                "remaining_identification_requests": done.remaining_requests,
            })),
        )
            .into_response()),
        Err(err) => Ok(attempt_failure_response(err)),
    }
}

/// POST /api/upload-image
///
/// Media ingestion only; no classification.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let ImageUpload { bytes, mime, .. } = read_image_upload(multipart).await?;

    let uploaded = state
        .ingestor
        .upload(bytes, &mime)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok((StatusCode::OK, Json(uploaded)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ClassifyImageRequest {
    pub image_url: String,
    #[serde(default)]
    pub organ: Option<String>,
}

/// POST /api/classify-image
///
/// Classifies an already-uploaded image URL and returns the canonical
/// record. Does not append to the history ledger.
pub async fn classify_image(
    State(state): State<AppState>,
    Json(request): Json<ClassifyImageRequest>,
) -> ApiResult<Response> {
    if request.image_url.trim().is_empty() {
        return Err(ApiError::BadRequest("Image URL is required".to_string()));
    }
    let organ = request.organ.as_deref().unwrap_or(DEFAULT_ORGAN);

    let response = state
        .classifier
        .classify(&request.image_url, organ)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let remaining = response.remaining_requests();
    let record = normalizer::normalize(&response, &request.image_url).map_err(|e| match e {
        NormalizationError::NoMatch => ApiError::Unprocessable("No species match found".to_string()),
        NormalizationError::MissingScientificName => {
            ApiError::Unprocessable("Provider match had no usable identity".to_string())
        }
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "record": record,
            "remaining_identification_requests": remaining,
        })),
    )
        .into_response())
}

/// Parsed multipart image upload
struct ImageUpload {
    bytes: Vec<u8>,
    mime: String,
    organ: String,
}

/// Read the `file` (and optional `organ`) parts of a multipart upload
///
/// The payload must sniff as an image; the declared part content type is
/// only a fallback label when the sniffed type agrees it is an image.
async fn read_image_upload(mut multipart: Multipart) -> ApiResult<ImageUpload> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut declared_mime: Option<String> = None;
    let mut organ = DEFAULT_ORGAN.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                declared_mime = field.content_type().map(|ct| ct.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                bytes = Some(data.to_vec());
            }
            Some("organ") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read organ: {}", e)))?;
                if !value.trim().is_empty() {
                    organ = value.trim().to_string();
                }
            }
            _ => continue,
        }
    }

    let bytes = bytes.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let mime = sniff_image_mime(&bytes, declared_mime.as_deref())?;
    debug!(mime = %mime, size_bytes = bytes.len(), organ = %organ, "Accepted image upload");

    Ok(ImageUpload { bytes, mime, organ })
}

/// Determine the image MIME type from the payload bytes
fn sniff_image_mime(bytes: &[u8], declared: Option<&str>) -> ApiResult<String> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
            Ok(kind.mime_type().to_string())
        }
        Some(kind) => Err(ApiError::BadRequest(format!(
            "Unsupported upload type: {}",
            kind.mime_type()
        ))),
        None => match declared {
            Some(mime) if mime.starts_with("image/") => Ok(mime.to_string()),
            _ => Err(ApiError::BadRequest(
                "Upload does not look like an image".to_string(),
            )),
        },
    }
}

/// Build the failure response for a terminal attempt error
///
/// Stages past upload keep the upload facts in the body next to the
/// typed failure.
fn attempt_failure_response(err: AttemptError) -> Response {
    let (status, code) = match &err {
        AttemptError::Upload { .. } => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
        AttemptError::Classification { .. } => (StatusCode::BAD_GATEWAY, "CLASSIFICATION_FAILED"),
        AttemptError::Normalization {
            source: NormalizationError::NoMatch,
            ..
        } => (StatusCode::UNPROCESSABLE_ENTITY, "NO_MATCH"),
        AttemptError::Normalization { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "NO_USABLE_RESULT")
        }
        AttemptError::Persistence { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILED")
        }
    };

    let mut body = json!({
        "error": {
            "code": code,
            "message": err.to_string(),
        }
    });
    if let Some(upload) = err.surviving_upload() {
        body["upload"] = serde_json::to_value(upload).unwrap_or(Value::Null);
    }

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal valid JPEG/PNG magic prefixes for sniffing
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn sniffs_jpeg_and_png() {
        assert_eq!(sniff_image_mime(JPEG_MAGIC, None).unwrap(), "image/jpeg");
        assert_eq!(sniff_image_mime(PNG_MAGIC, None).unwrap(), "image/png");
    }

    #[test]
    fn rejects_non_image_payloads() {
        // PDF magic
        let pdf = b"%PDF-1.4 pretend document";
        assert!(sniff_image_mime(pdf, Some("image/jpeg")).is_err());

        // Unidentifiable bytes with a non-image declared type
        assert!(sniff_image_mime(b"hello", Some("text/plain")).is_err());
        assert!(sniff_image_mime(b"hello", None).is_err());
    }

    #[test]
    fn falls_back_to_declared_image_type() {
        // Unidentifiable bytes but the client declared an image type
        let mime = sniff_image_mime(b"\x00\x01\x02", Some("image/svg+xml")).unwrap();
        assert_eq!(mime, "image/svg+xml");
    }
}
