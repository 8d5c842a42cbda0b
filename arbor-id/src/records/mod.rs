//! Persisted user record stores
//!
//! `UserRecords` owns the history ledger and the species collection, the
//! only shared mutable state between concurrent identification attempts.
//! Every operation takes the structure's lock, loads state on first use,
//! applies the mutation, and persists the whole structure before the lock
//! is released, so concurrent completions cannot drop entries or exceed
//! the history bound.

pub mod collection;
pub mod history;
pub mod storage;

use std::sync::Arc;

use arbor_common::{Error, Result};
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::IdentificationRecord;
pub use collection::{AlreadyExists, CollectionSet};
pub use history::{HistoryLedger, HISTORY_CAPACITY};
pub use storage::{FileStorage, MemoryStorage, RecordStorage};

/// Storage key of the persisted history array
const HISTORY_KEY: &str = "history";

/// Storage key of the persisted collection array
const COLLECTION_KEY: &str = "collection";

/// Outcome of a collection add through the shared store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionAddOutcome {
    Added,
    /// The species was already present; state is unchanged
    AlreadyPresent { scientific_name: String },
}

/// Owner of the user's persisted record stores
pub struct UserRecords {
    storage: Arc<dyn RecordStorage>,
    history: Mutex<Option<HistoryLedger>>,
    collection: Mutex<Option<CollectionSet>>,
}

impl UserRecords {
    pub fn new(storage: Arc<dyn RecordStorage>) -> Self {
        Self {
            storage,
            history: Mutex::new(None),
            collection: Mutex::new(None),
        }
    }

    /// Append a completed identification to the history ledger
    pub async fn record(&self, entry: IdentificationRecord) -> Result<()> {
        let mut guard = self.history.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_history().await?);
        }
        let ledger = guard.as_mut().expect("history initialized above");

        ledger.record(entry);
        self.persist(HISTORY_KEY, ledger).await
    }

    /// History entries, newest to oldest
    pub async fn history(&self) -> Result<Vec<IdentificationRecord>> {
        let mut guard = self.history.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_history().await?);
        }
        let ledger = guard.as_ref().expect("history initialized above");
        Ok(ledger.list().to_vec())
    }

    /// Add an identification to the species collection
    pub async fn add_to_collection(
        &self,
        entry: IdentificationRecord,
    ) -> Result<CollectionAddOutcome> {
        let mut guard = self.collection.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_collection().await?);
        }
        let set = guard.as_mut().expect("collection initialized above");

        match set.add(entry) {
            Ok(()) => {
                self.persist(COLLECTION_KEY, set).await?;
                Ok(CollectionAddOutcome::Added)
            }
            Err(AlreadyExists { scientific_name }) => {
                debug!(species = %scientific_name, "Collection add skipped: already present");
                Ok(CollectionAddOutcome::AlreadyPresent { scientific_name })
            }
        }
    }

    /// Remove a species from the collection; absent keys are a no-op
    pub async fn remove_from_collection(&self, scientific_name: &str) -> Result<()> {
        let mut guard = self.collection.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_collection().await?);
        }
        let set = guard.as_mut().expect("collection initialized above");

        set.remove(scientific_name);
        self.persist(COLLECTION_KEY, set).await
    }

    /// Collection entries in display order
    pub async fn collection(&self) -> Result<Vec<IdentificationRecord>> {
        let mut guard = self.collection.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_collection().await?);
        }
        let set = guard.as_ref().expect("collection initialized above");
        Ok(set.list().to_vec())
    }

    async fn load_history(&self) -> Result<HistoryLedger> {
        match self.storage.get(HISTORY_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Internal(format!("Corrupt history store: {}", e))),
            None => Ok(HistoryLedger::new()),
        }
    }

    async fn load_collection(&self) -> Result<CollectionSet> {
        match self.storage.get(COLLECTION_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Internal(format!("Corrupt collection store: {}", e))),
            None => Ok(CollectionSet::new()),
        }
    }

    async fn persist<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| Error::Internal(format!("Serialize {} failed: {}", key, e)))?;
        self.storage.set(key, bytes).await
    }
}
