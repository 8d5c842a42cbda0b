//! arbor-id - Plant Identification Service
//!
//! Accepts plant photo uploads, obtains ranked species identifications
//! from the PlantNet recognition provider, and manages the resulting
//! records (bounded history, curated collection) plus the admin species
//! catalog.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use arbor_common::config::{self, DataDirInitializer};
use arbor_id::records::{FileStorage, UserRecords};
use arbor_id::services::{MediaStoreClient, PlantNetClient};
use arbor_id::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting arbor-id (Plant Identification) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration and resolve the data folder
    let toml_config = config::load_toml_config()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    let data_dir = config::resolve_data_dir(&toml_config);

    let initializer = DataDirInitializer::new(data_dir);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize data folder: {}", e))?;
    info!("Data folder: {}", initializer.data_dir().display());

    // External collaborator clients
    let api_key = arbor_id::config::resolve_plantnet_api_key(&toml_config)?;
    let classifier: Arc<PlantNetClient> =
        match arbor_id::config::resolve_plantnet_base_url(&toml_config) {
            Some(base_url) => Arc::new(PlantNetClient::with_base_url(api_key, base_url)?),
            None => Arc::new(PlantNetClient::new(api_key)?),
        };

    let media_store_url = arbor_id::config::resolve_media_store_url(&toml_config)?;
    let ingestor = Arc::new(MediaStoreClient::new(media_store_url)?);

    // User record stores (file-backed)
    let storage = Arc::new(FileStorage::new(initializer.records_dir()));
    let records = Arc::new(UserRecords::new(storage));

    // Catalog database (process-wide pool, single acquisition point)
    let db_path = initializer.database_path();
    info!("Catalog database: {}", db_path.display());
    let db_pool = arbor_id::db::catalog_pool(&db_path).await?.clone();
    info!("Catalog database connection established");

    let admin_secret = arbor_id::config::resolve_admin_secret(&toml_config);
    let state = AppState::new(db_pool, ingestor, classifier, records, admin_secret);

    let app = arbor_id::build_router(state);

    // Start server
    let bind_addr = arbor_id::config::resolve_bind_addr(&toml_config);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
