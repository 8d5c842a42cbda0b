//! arbor-id library interface
//!
//! Identification service: uploads plant photos to the media store, asks
//! the recognition provider for a species match, normalizes the response
//! into the canonical record, and maintains the user's history ledger and
//! species collection. The admin species catalog rides alongside on its
//! own SQLite store.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod records;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::records::UserRecords;
use crate::types::{ImageIngestor, SpeciesClassifier};
use crate::workflow::IdentifyOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Catalog database pool (catalog only; the pipeline never uses it)
    pub db: SqlitePool,
    /// User record stores (history + collection)
    pub records: Arc<UserRecords>,
    /// Media store client (standalone upload endpoint)
    pub ingestor: Arc<dyn ImageIngestor>,
    /// Recognition provider client (standalone classify endpoint)
    pub classifier: Arc<dyn SpeciesClassifier>,
    /// Full-pipeline orchestrator
    pub orchestrator: Arc<IdentifyOrchestrator>,
    /// Shared secret gating catalog mutations
    pub admin_secret: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        ingestor: Arc<dyn ImageIngestor>,
        classifier: Arc<dyn SpeciesClassifier>,
        records: Arc<UserRecords>,
        admin_secret: String,
    ) -> Self {
        let orchestrator = Arc::new(IdentifyOrchestrator::new(
            ingestor.clone(),
            classifier.clone(),
            records.clone(),
        ));

        Self {
            db,
            records,
            ingestor,
            classifier,
            orchestrator,
            admin_secret,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::identify_routes())
        .merge(api::records_routes())
        .merge(api::catalog_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
