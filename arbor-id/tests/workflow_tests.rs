//! Identification workflow integration tests
//!
//! Exercises the orchestrator end-to-end over mock collaborator seams:
//! no network, no real provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use arbor_id::records::{MemoryStorage, UserRecords, HISTORY_CAPACITY};
use arbor_id::services::normalizer::ProviderResponse;
use arbor_id::types::{
    ClassificationError, ImageIngestor, IngestError, NormalizationError, SpeciesClassifier,
    UploadedImage,
};
use arbor_id::workflow::{AttemptError, AttemptEvent, AttemptState, IdentifyOrchestrator};

const UPLOAD_URL: &str = "https://media.example/plant-identification/leaf.jpg";

struct MockIngestor {
    fail: bool,
}

#[async_trait::async_trait]
impl ImageIngestor for MockIngestor {
    async fn upload(&self, _bytes: Vec<u8>, _mime: &str) -> Result<UploadedImage, IngestError> {
        if self.fail {
            return Err(IngestError::Rejected {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(UploadedImage {
            url: UPLOAD_URL.to_string(),
            object_id: "plant-identification/leaf".to_string(),
        })
    }
}

enum ClassifierMode {
    /// Ranked shape with the given top species/score
    Match { name: &'static str, score: f64 },
    /// Unique species per call ("Species N")
    Sequence,
    /// Empty results list
    Empty,
    /// Provider rejection
    Rejected,
}

struct MockClassifier {
    mode: ClassifierMode,
    calls: AtomicUsize,
}

impl MockClassifier {
    fn new(mode: ClassifierMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    fn ranked(name: &str, score: f64) -> ProviderResponse {
        serde_json::from_value(serde_json::json!({
            "query": {"project": "all", "images": [UPLOAD_URL], "organs": ["leaf"]},
            "results": [{
                "score": score,
                "species": {
                    "scientificNameWithoutAuthor": name,
                    "commonNames": ["English oak"],
                    "genus": {"scientificNameWithoutAuthor": "Quercus"},
                    "family": {"scientificNameWithoutAuthor": "Fagaceae"},
                }
            }],
            "remainingIdentificationRequests": 42
        }))
        .unwrap()
    }
}

#[async_trait::async_trait]
impl SpeciesClassifier for MockClassifier {
    async fn classify(
        &self,
        _image_url: &str,
        _organ: &str,
    ) -> Result<ProviderResponse, ClassificationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            ClassifierMode::Match { name, score } => Ok(Self::ranked(name, *score)),
            ClassifierMode::Sequence => Ok(Self::ranked(&format!("Species {}", call), 0.5)),
            ClassifierMode::Empty => Ok(serde_json::from_str("{\"results\": []}").unwrap()),
            ClassifierMode::Rejected => Err(ClassificationError::ProviderRejected {
                status: 429,
                message: "quota exceeded".to_string(),
            }),
        }
    }
}

fn setup(
    ingestor_fails: bool,
    mode: ClassifierMode,
) -> (IdentifyOrchestrator, Arc<UserRecords>) {
    let records = Arc::new(UserRecords::new(Arc::new(MemoryStorage::new())));
    let orchestrator = IdentifyOrchestrator::new(
        Arc::new(MockIngestor {
            fail: ingestor_fails,
        }),
        Arc::new(MockClassifier::new(mode)),
        records.clone(),
    );
    (orchestrator, records)
}

#[tokio::test]
async fn successful_attempt_lands_at_history_head() {
    let (orchestrator, records) = setup(
        false,
        ClassifierMode::Match {
            name: "Quercus robur",
            score: 0.87,
        },
    );

    let done = orchestrator
        .run(vec![1, 2, 3], "image/jpeg", "leaf")
        .await
        .unwrap();

    assert_eq!(done.record.scientific_name, "Quercus robur");
    assert_eq!(done.record.confidence, 0.87);
    assert_eq!(done.record.source_image_url, UPLOAD_URL);
    assert_eq!(done.upload.url, UPLOAD_URL);
    assert_eq!(done.remaining_requests, Some(42));

    let history = records.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].scientific_name, "Quercus robur");
}

#[tokio::test]
async fn upload_failure_records_nothing() {
    let (orchestrator, records) = setup(
        true,
        ClassifierMode::Match {
            name: "Quercus robur",
            score: 0.87,
        },
    );

    let err = orchestrator
        .run(vec![1], "image/jpeg", "leaf")
        .await
        .unwrap_err();

    assert!(matches!(err, AttemptError::Upload { .. }));
    assert!(err.surviving_upload().is_none());
    assert!(records.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn classification_failure_keeps_the_upload() {
    let (orchestrator, records) = setup(false, ClassifierMode::Rejected);

    let err = orchestrator
        .run(vec![1], "image/jpeg", "leaf")
        .await
        .unwrap_err();

    // The upload outcome stands alone: its URL stays available for reuse
    let upload = err.surviving_upload().expect("upload survives");
    assert_eq!(upload.url, UPLOAD_URL);
    assert!(matches!(
        err,
        AttemptError::Classification {
            source: ClassificationError::ProviderRejected { status: 429, .. },
            ..
        }
    ));
    assert!(records.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn no_match_is_a_normalization_failure() {
    let (orchestrator, records) = setup(false, ClassifierMode::Empty);

    let err = orchestrator
        .run(vec![1], "image/jpeg", "leaf")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttemptError::Normalization {
            source: NormalizationError::NoMatch,
            ..
        }
    ));
    assert!(err.surviving_upload().is_some());
    assert!(records.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn fifty_first_attempt_evicts_the_first() {
    let (orchestrator, records) = setup(false, ClassifierMode::Sequence);

    for _ in 0..51 {
        orchestrator
            .run(vec![1], "image/jpeg", "leaf")
            .await
            .unwrap();
    }

    let history = records.history().await.unwrap();
    assert_eq!(history.len(), HISTORY_CAPACITY);
    assert_eq!(history[0].scientific_name, "Species 50");
    // The very first identification has been evicted
    assert!(history
        .iter()
        .all(|record| record.scientific_name != "Species 0"));
}

#[tokio::test]
async fn success_path_emits_ordered_state_changes() {
    let records = Arc::new(UserRecords::new(Arc::new(MemoryStorage::new())));
    let (tx, mut rx) = mpsc::channel(32);
    let orchestrator = IdentifyOrchestrator::new(
        Arc::new(MockIngestor { fail: false }),
        Arc::new(MockClassifier::new(ClassifierMode::Match {
            name: "Quercus robur",
            score: 0.87,
        })),
        records,
    )
    .with_events(tx);

    orchestrator
        .run(vec![1], "image/jpeg", "leaf")
        .await
        .unwrap();
    drop(orchestrator);

    let mut states = Vec::new();
    while let Some(event) = rx.recv().await {
        if let AttemptEvent::StateChanged { new_state, .. } = event {
            states.push(new_state);
        }
    }

    assert_eq!(
        states,
        vec![
            AttemptState::Uploading,
            AttemptState::Uploaded,
            AttemptState::Classifying,
            AttemptState::Normalized,
            AttemptState::Recorded,
        ]
    );
}

#[tokio::test]
async fn concurrent_attempts_all_reach_the_ledger() {
    let records = Arc::new(UserRecords::new(Arc::new(MemoryStorage::new())));
    let orchestrator = Arc::new(IdentifyOrchestrator::new(
        Arc::new(MockIngestor { fail: false }),
        Arc::new(MockClassifier::new(ClassifierMode::Sequence)),
        records.clone(),
    ));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.run(vec![1], "image/jpeg", "leaf").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(records.history().await.unwrap().len(), 10);
}
