//! Catalog database access
//!
//! The species catalog lives in SQLite behind a process-wide,
//! lazily-initialized connection pool with a single acquisition point.
//! The pool's lifetime is the process; only the catalog uses it; the
//! identification pipeline persists through the record-storage port and
//! never touches this database.

pub mod schema;
pub mod species;

use std::path::Path;

use arbor_common::Result;
use sqlx::SqlitePool;
use tokio::sync::OnceCell;

static CATALOG_POOL: OnceCell<SqlitePool> = OnceCell::const_new();

/// Acquire the process-wide catalog pool, connecting on first use
pub async fn catalog_pool(db_path: &Path) -> Result<&'static SqlitePool> {
    CATALOG_POOL
        .get_or_try_init(|| async { init_database_pool(db_path).await })
        .await
}

/// Initialize a catalog connection pool
///
/// Connects to (or creates) the database file and ensures the schema
/// exists. Tests call this directly with their own paths; the service
/// goes through `catalog_pool`.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to catalog database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    schema::init_tables(&pool).await?;

    Ok(pool)
}
