//! Identification attempt orchestrator
//!
//! Drives one attempt through upload → classify → normalize → record as a
//! strictly ordered chain: classification needs the URL that upload
//! produces, so there is no parallelism inside an attempt. Concurrent
//! attempts each own their state machine and record; the only shared
//! mutable state is `UserRecords`, touched exactly once at the end.
//!
//! Failures are attempt-scoped and carry their facts independently: a
//! classification or normalization failure still returns the surviving
//! upload so callers can report "image uploaded" and "classification
//! failed" separately and reuse the URL.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::records::UserRecords;
use crate::services::normalizer;
use crate::types::{
    ClassificationError, IdentificationRecord, ImageIngestor, IngestError, NormalizationError,
    SpeciesClassifier, UploadedImage,
};

use super::{AttemptEvent, AttemptState, IdentifyAttempt};

/// Successful attempt outcome
#[derive(Debug, Clone)]
pub struct CompletedIdentification {
    pub attempt_id: Uuid,
    pub upload: UploadedImage,
    pub record: IdentificationRecord,
    /// Provider quota echo, when present in the response
    pub remaining_requests: Option<i64>,
}

/// Terminal attempt failure
///
/// Stages past upload keep the `UploadedImage`: the upload outcome stays
/// valid even when the rest of the attempt fails.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Image upload failed: {source}")]
    Upload {
        #[source]
        source: IngestError,
    },

    #[error("Classification failed: {source}")]
    Classification {
        upload: UploadedImage,
        #[source]
        source: ClassificationError,
    },

    #[error("No usable identification: {source}")]
    Normalization {
        upload: UploadedImage,
        #[source]
        source: NormalizationError,
    },

    #[error("Failed to persist identification: {source}")]
    Persistence {
        upload: UploadedImage,
        #[source]
        source: arbor_common::Error,
    },
}

impl AttemptError {
    /// The upload that survived the failed attempt, if any
    pub fn surviving_upload(&self) -> Option<&UploadedImage> {
        match self {
            AttemptError::Upload { .. } => None,
            AttemptError::Classification { upload, .. }
            | AttemptError::Normalization { upload, .. }
            | AttemptError::Persistence { upload, .. } => Some(upload),
        }
    }
}

/// Orchestrator for identification attempts
pub struct IdentifyOrchestrator {
    ingestor: Arc<dyn ImageIngestor>,
    classifier: Arc<dyn SpeciesClassifier>,
    records: Arc<UserRecords>,
    event_tx: Option<mpsc::Sender<AttemptEvent>>,
}

impl IdentifyOrchestrator {
    pub fn new(
        ingestor: Arc<dyn ImageIngestor>,
        classifier: Arc<dyn SpeciesClassifier>,
        records: Arc<UserRecords>,
    ) -> Self {
        Self {
            ingestor,
            classifier,
            records,
            event_tx: None,
        }
    }

    /// Attach an event channel for progress reporting
    pub fn with_events(mut self, event_tx: mpsc::Sender<AttemptEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Run one identification attempt to a terminal state
    pub async fn run(
        &self,
        image: Vec<u8>,
        mime: &str,
        organ: &str,
    ) -> Result<CompletedIdentification, AttemptError> {
        let mut attempt = IdentifyAttempt::new();
        info!(attempt_id = %attempt.attempt_id, "Starting identification attempt");

        self.transition(&mut attempt, AttemptState::Uploading).await;
        let upload = match self.ingestor.upload(image, mime).await {
            Ok(upload) => upload,
            Err(source) => {
                self.fail(&mut attempt, AttemptState::UploadFailed, &source)
                    .await;
                return Err(AttemptError::Upload { source });
            }
        };
        self.transition(&mut attempt, AttemptState::Uploaded).await;
        self.emit(AttemptEvent::ImageUploaded {
            attempt_id: attempt.attempt_id,
            url: upload.url.clone(),
        })
        .await;

        self.transition(&mut attempt, AttemptState::Classifying)
            .await;
        let response = match self.classifier.classify(&upload.url, organ).await {
            Ok(response) => response,
            Err(source) => {
                self.fail(&mut attempt, AttemptState::ClassificationFailed, &source)
                    .await;
                return Err(AttemptError::Classification { upload, source });
            }
        };
        let remaining_requests = response.remaining_requests();

        let record = match normalizer::normalize(&response, &upload.url) {
            Ok(record) => record,
            Err(source) => {
                self.fail(&mut attempt, AttemptState::NormalizationFailed, &source)
                    .await;
                return Err(AttemptError::Normalization { upload, source });
            }
        };
        self.transition(&mut attempt, AttemptState::Normalized).await;

        // Reaching a normalized record always lands it in the history
        if let Err(source) = self.records.record(record.clone()).await {
            error!(attempt_id = %attempt.attempt_id, error = %source, "History write failed");
            return Err(AttemptError::Persistence { upload, source });
        }
        self.transition(&mut attempt, AttemptState::Recorded).await;
        self.emit(AttemptEvent::Identified {
            attempt_id: attempt.attempt_id,
            scientific_name: record.scientific_name.clone(),
            confidence: record.confidence,
        })
        .await;

        info!(
            attempt_id = %attempt.attempt_id,
            species = %record.scientific_name,
            confidence = record.confidence,
            "Identification recorded"
        );

        Ok(CompletedIdentification {
            attempt_id: attempt.attempt_id,
            upload,
            record,
            remaining_requests,
        })
    }

    async fn transition(&self, attempt: &mut IdentifyAttempt, new_state: AttemptState) {
        let transition = attempt.transition_to(new_state);
        debug!(
            attempt_id = %transition.attempt_id,
            from = ?transition.old_state,
            to = ?transition.new_state,
            "Attempt state change"
        );
        self.emit(AttemptEvent::StateChanged {
            attempt_id: transition.attempt_id,
            old_state: transition.old_state,
            new_state: transition.new_state,
        })
        .await;
    }

    async fn fail(
        &self,
        attempt: &mut IdentifyAttempt,
        state: AttemptState,
        source: &(dyn std::error::Error + Send + Sync),
    ) {
        self.transition(attempt, state).await;
        error!(attempt_id = %attempt.attempt_id, state = ?state, error = %source, "Attempt failed");
        self.emit(AttemptEvent::AttemptFailed {
            attempt_id: attempt.attempt_id,
            state,
            message: source.to_string(),
        })
        .await;
    }

    async fn emit(&self, event: AttemptEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.send(event).await.is_err() {
                debug!("Attempt event receiver dropped");
            }
        }
    }
}
