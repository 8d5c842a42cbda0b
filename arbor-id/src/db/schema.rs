//! Catalog schema definition

use arbor_common::Result;
use sqlx::SqlitePool;

/// Create catalog tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS species (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            leaf_shape TEXT,
            bark_texture TEXT,
            fruit_type TEXT,
            growth_habit TEXT,
            image_url TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
