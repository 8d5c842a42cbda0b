//! User species collection
//!
//! Explicitly curated set of identifications, deduplicated by scientific
//! name. Adding a species that is already present is a user-facing notice,
//! not a system failure, and never overwrites the existing entry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::IdentificationRecord;

/// Add conflict: the species is already in the collection
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Species already in collection: {scientific_name}")]
pub struct AlreadyExists {
    pub scientific_name: String,
}

/// Species collection, keyed by scientific name
///
/// Display order is most-recently-added first. Serialized as a bare JSON
/// array. No capacity bound.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionSet {
    entries: Vec<IdentificationRecord>,
}

impl CollectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identification to the collection
    ///
    /// Rejected without mutating state when the scientific name is
    /// already present: the first-added entry wins.
    pub fn add(&mut self, entry: IdentificationRecord) -> Result<(), AlreadyExists> {
        if self.contains(&entry.scientific_name) {
            return Err(AlreadyExists {
                scientific_name: entry.scientific_name,
            });
        }
        self.entries.insert(0, entry);
        Ok(())
    }

    /// Remove a species by scientific name; absent keys are a no-op
    pub fn remove(&mut self, scientific_name: &str) {
        self.entries
            .retain(|entry| entry.scientific_name != scientific_name);
    }

    pub fn contains(&self, scientific_name: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.scientific_name == scientific_name)
    }

    /// Entries in display order (most recently added first)
    pub fn list(&self) -> &[IdentificationRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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
    fn duplicate_add_reports_conflict_and_keeps_first_entry() {
        let mut set = CollectionSet::new();
        set.add(record("Quercus robur", 0.9)).unwrap();

        let err = set.add(record("Quercus robur", 0.4)).unwrap_err();
        assert_eq!(err.scientific_name, "Quercus robur");
        assert_eq!(set.len(), 1);
        // The original confidence survives
        assert_eq!(set.list()[0].confidence, 0.9);
    }

    #[test]
    fn remove_absent_key_is_a_no_op() {
        let mut set = CollectionSet::new();
        set.add(record("Quercus robur", 0.9)).unwrap();

        set.remove("Tilia cordata");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_then_re_add_succeeds() {
        let mut set = CollectionSet::new();
        set.add(record("Quercus robur", 0.9)).unwrap();
        set.remove("Quercus robur");
        assert!(set.is_empty());

        set.add(record("Quercus robur", 0.7)).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display_order_is_most_recently_added_first() {
        let mut set = CollectionSet::new();
        set.add(record("Quercus robur", 0.9)).unwrap();
        set.add(record("Tilia cordata", 0.8)).unwrap();

        assert_eq!(set.list()[0].scientific_name, "Tilia cordata");
        assert_eq!(set.list()[1].scientific_name, "Quercus robur");
    }
}
