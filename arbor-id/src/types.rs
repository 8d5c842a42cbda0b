//! Core types and trait definitions for arbor-id
//!
//! Defines the canonical identification record plus the two external
//! collaborator seams of the pipeline:
//! - `ImageIngestor`: media store upload (blob in, stable URL out)
//! - `SpeciesClassifier`: external recognition provider lookup
//!
//! Both seams are trait objects so the orchestrator can be exercised in
//! tests without any network access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::normalizer::ProviderResponse;

// ============================================================================
// Canonical record model
// ============================================================================

/// Multi-resolution reference image URLs
///
/// A provider entry missing a resolution keeps the others; a missing
/// variant is `None`, never a normalization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageVariants {
    /// Original resolution URL
    pub original: Option<String>,
    /// Medium resolution URL
    pub medium: Option<String>,
    /// Small resolution URL
    pub small: Option<String>,
}

/// A provider reference image with its plant-organ annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub variants: ImageVariants,
    /// Organ shown ("leaf", "bark", "flower", ...); empty when unknown
    #[serde(default)]
    pub organ: String,
}

/// Canonical, provider-independent identification result
///
/// `scientific_name` is the identity key: two records with the same
/// scientific name describe the same species regardless of confidence
/// or imagery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationRecord {
    /// Bare scientific name, authorship stripped (identity key)
    pub scientific_name: String,
    /// Top-match confidence, clamped to [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub common_names: Vec<String>,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub genus: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub vernacular_names: Vec<String>,
    #[serde(default)]
    pub reference_images: Vec<ReferenceImage>,
    /// URL of the user's uploaded image this record was derived from
    #[serde(default)]
    pub source_image_url: String,
    pub created_at: DateTime<Utc>,
}

impl IdentificationRecord {
    /// Dedup identity check (scientific name only)
    pub fn same_species(&self, other: &IdentificationRecord) -> bool {
        self.scientific_name == other.scientific_name
    }
}

// ============================================================================
// Media ingestion seam
// ============================================================================

/// Outcome of a successful media store upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Stable HTTPS URL of the stored image
    #[serde(alias = "secure_url")]
    pub url: String,
    /// Opaque provider identifier for the stored object
    #[serde(alias = "public_id", alias = "objectId")]
    pub object_id: String,
}

/// Media ingestion failure (terminal for the attempt, no partial state)
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Upload transport error: {0}")]
    Transport(String),

    #[error("Media store rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed media store response: {0}")]
    MalformedResponse(String),
}

/// Media Ingestion Adapter contract
///
/// `upload` is a single atomic outcome: either the blob is stored and a
/// stable URL comes back, or the attempt failed. No retries here.
#[async_trait::async_trait]
pub trait ImageIngestor: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, mime: &str) -> Result<UploadedImage, IngestError>;
}

// ============================================================================
// Classification seam
// ============================================================================

/// Classification Gateway failure taxonomy
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Classifier transport error: {0}")]
    Transport(String),

    #[error("Invalid recognition provider API key")]
    InvalidApiKey,

    #[error("Provider rejected request ({status}): {message}")]
    ProviderRejected { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Classification Gateway contract
///
/// One request per call; the caller decides how to surface a failure.
/// The raw provider response is returned un-normalized so the caller can
/// also read quota information the normalizer discards.
#[async_trait::async_trait]
pub trait SpeciesClassifier: Send + Sync {
    async fn classify(
        &self,
        image_url: &str,
        organ: &str,
    ) -> Result<ProviderResponse, ClassificationError>;
}

// ============================================================================
// Normalization errors
// ============================================================================

/// Result Normalizer failure taxonomy
///
/// `NoMatch` is the empty/absent result list; `MissingScientificName` is
/// the rare provider match carrying no usable identity. Everything else
/// degrades gracefully to empty collections or absent image variants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("Provider returned no matches")]
    NoMatch,

    #[error("Top match has no scientific name")]
    MissingScientificName,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, confidence: f64) -> IdentificationRecord {
        IdentificationRecord {
            scientific_name: name.to_string(),
            confidence,
            common_names: Vec::new(),
            family: String::new(),
            genus: String::new(),
            synonyms: Vec::new(),
            vernacular_names: Vec::new(),
            reference_images: Vec::new(),
            source_image_url: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn same_species_ignores_confidence() {
        let a = record("Quercus robur", 0.9);
        let b = record("Quercus robur", 0.2);
        let c = record("Quercus rubra", 0.9);

        assert!(a.same_species(&b));
        assert!(!a.same_species(&c));
    }

    #[test]
    fn uploaded_image_accepts_provider_field_names() {
        let json = r#"{"secure_url": "https://img.example/x.jpg", "public_id": "folder/x"}"#;
        let upload: UploadedImage = serde_json::from_str(json).unwrap();
        assert_eq!(upload.url, "https://img.example/x.jpg");
        assert_eq!(upload.object_id, "folder/x");
    }
}
