//! Record store integration tests
//!
//! Ledger/collection policy over real file-backed storage.

use std::sync::Arc;

use chrono::Utc;

use arbor_id::records::{
    CollectionAddOutcome, FileStorage, UserRecords, HISTORY_CAPACITY,
};
use arbor_id::types::IdentificationRecord;

fn record(name: &str, confidence: f64) -> IdentificationRecord {
    IdentificationRecord {
        scientific_name: name.to_string(),
        confidence,
        common_names: vec!["English oak".to_string()],
        family: "Fagaceae".to_string(),
        genus: "Quercus".to_string(),
        synonyms: Vec::new(),
        vernacular_names: Vec::new(),
        reference_images: Vec::new(),
        source_image_url: "https://media.example/leaf.jpg".to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn history_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
        records.record(record("Quercus robur", 0.87)).await.unwrap();
        records.record(record("Tilia cordata", 0.61)).await.unwrap();
    }

    // A fresh store over the same folder sees the same ledger
    let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
    let history = records.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].scientific_name, "Tilia cordata");
    assert_eq!(history[1].scientific_name, "Quercus robur");
}

#[tokio::test]
async fn history_honors_capacity_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    {
        let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
        for i in 0..51 {
            records
                .record(record(&format!("Species {}", i), 0.5))
                .await
                .unwrap();
        }
    }

    let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
    let history = records.history().await.unwrap();
    assert_eq!(history.len(), HISTORY_CAPACITY);
    assert_eq!(history[0].scientific_name, "Species 50");
    assert_eq!(history[49].scientific_name, "Species 1");
}

#[tokio::test]
async fn collection_keeps_the_first_added_entry() {
    let dir = tempfile::tempdir().unwrap();
    let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));

    assert_eq!(
        records
            .add_to_collection(record("Quercus robur", 0.87))
            .await
            .unwrap(),
        CollectionAddOutcome::Added
    );

    // Same species, different confidence: rejected, original untouched
    assert_eq!(
        records
            .add_to_collection(record("Quercus robur", 0.42))
            .await
            .unwrap(),
        CollectionAddOutcome::AlreadyPresent {
            scientific_name: "Quercus robur".to_string()
        }
    );

    let collection = records.collection().await.unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection[0].confidence, 0.87);
}

#[tokio::test]
async fn collection_remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));

    records
        .add_to_collection(record("Quercus robur", 0.87))
        .await
        .unwrap();

    records.remove_from_collection("Tilia cordata").await.unwrap();
    assert_eq!(records.collection().await.unwrap().len(), 1);

    records.remove_from_collection("Quercus robur").await.unwrap();
    records.remove_from_collection("Quercus robur").await.unwrap();
    assert!(records.collection().await.unwrap().is_empty());
}

#[tokio::test]
async fn history_and_collection_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));

    records.record(record("Quercus robur", 0.87)).await.unwrap();
    records.record(record("Quercus robur", 0.91)).await.unwrap();

    // History keeps duplicates; the collection is untouched by record()
    assert_eq!(records.history().await.unwrap().len(), 2);
    assert!(records.collection().await.unwrap().is_empty());

    records
        .add_to_collection(record("Quercus robur", 0.91))
        .await
        .unwrap();
    records.remove_from_collection("Quercus robur").await.unwrap();

    // Collection removal never touches the ledger
    assert_eq!(records.history().await.unwrap().len(), 2);
}

#[tokio::test]
async fn persisted_layout_is_a_bare_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let records = UserRecords::new(Arc::new(FileStorage::new(dir.path().to_path_buf())));
    records.record(record("Quercus robur", 0.87)).await.unwrap();

    let raw = tokio::fs::read(dir.path().join("history.json")).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let array = value.as_array().expect("history persists as a JSON array");
    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["scientific_name"], "Quercus robur");
}
