//! Species catalog queries
//!
//! Administrator-authored reference entries, unrelated to identification
//! results. A conventional keyed store with a uniqueness constraint on
//! `name`: duplicate names are a Conflict, missing ids are NotFound.

use arbor_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Catalog reference entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub leaf_shape: Option<String>,
    pub bark_texture: Option<String>,
    pub fruit_type: Option<String>,
    pub growth_habit: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating a catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct NewCatalogEntry {
    pub name: String,
    #[serde(default)]
    pub leaf_shape: Option<String>,
    #[serde(default)]
    pub bark_texture: Option<String>,
    #[serde(default)]
    pub fruit_type: Option<String>,
    #[serde(default)]
    pub growth_habit: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial update of a catalog entry; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogEntryPatch {
    pub name: Option<String>,
    pub leaf_shape: Option<String>,
    pub bark_texture: Option<String>,
    pub fruit_type: Option<String>,
    pub growth_habit: Option<String>,
    pub image_url: Option<String>,
}

/// List all catalog entries, sorted by name
pub async fn list_species(pool: &SqlitePool) -> Result<Vec<CatalogEntry>> {
    let entries = sqlx::query_as::<_, CatalogEntry>(
        "SELECT id, name, leaf_shape, bark_texture, fruit_type, growth_habit, image_url, created_at
         FROM species ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Fetch one catalog entry by id
pub async fn get_species(pool: &SqlitePool, id: Uuid) -> Result<CatalogEntry> {
    sqlx::query_as::<_, CatalogEntry>(
        "SELECT id, name, leaf_shape, bark_texture, fruit_type, growth_habit, image_url, created_at
         FROM species WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Species not found: {}", id)))
}

/// Create a catalog entry
///
/// Duplicate names violate the UNIQUE constraint and come back as
/// `Error::Conflict`.
pub async fn create_species(pool: &SqlitePool, new: NewCatalogEntry) -> Result<CatalogEntry> {
    let name = new.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::InvalidInput("Species name is required".to_string()));
    }

    let entry = CatalogEntry {
        id: Uuid::new_v4(),
        name,
        leaf_shape: new.leaf_shape,
        bark_texture: new.bark_texture,
        fruit_type: new.fruit_type,
        growth_habit: new.growth_habit,
        image_url: new.image_url,
        created_at: Utc::now(),
    };

    let result = sqlx::query(
        "INSERT INTO species (id, name, leaf_shape, bark_texture, fruit_type, growth_habit, image_url, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.id)
    .bind(&entry.name)
    .bind(&entry.leaf_shape)
    .bind(&entry.bark_texture)
    .bind(&entry.fruit_type)
    .bind(&entry.growth_habit)
    .bind(&entry.image_url)
    .bind(entry.created_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(entry),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::Conflict(format!("Species name already exists: {}", entry.name)),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Apply a partial update to a catalog entry
pub async fn update_species(
    pool: &SqlitePool,
    id: Uuid,
    patch: CatalogEntryPatch,
) -> Result<CatalogEntry> {
    let mut entry = get_species(pool, id).await?;

    if let Some(name) = patch.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("Species name is required".to_string()));
        }
        entry.name = name;
    }
    if let Some(v) = patch.leaf_shape {
        entry.leaf_shape = Some(v);
    }
    if let Some(v) = patch.bark_texture {
        entry.bark_texture = Some(v);
    }
    if let Some(v) = patch.fruit_type {
        entry.fruit_type = Some(v);
    }
    if let Some(v) = patch.growth_habit {
        entry.growth_habit = Some(v);
    }
    if let Some(v) = patch.image_url {
        entry.image_url = Some(v);
    }

    let result = sqlx::query(
        "UPDATE species SET name = ?, leaf_shape = ?, bark_texture = ?, fruit_type = ?, growth_habit = ?, image_url = ?
         WHERE id = ?",
    )
    .bind(&entry.name)
    .bind(&entry.leaf_shape)
    .bind(&entry.bark_texture)
    .bind(&entry.fruit_type)
    .bind(&entry.growth_habit)
    .bind(&entry.image_url)
    .bind(entry.id)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(entry),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::Conflict(format!("Species name already exists: {}", entry.name)),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Delete a catalog entry by id
pub async fn delete_species(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM species WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Species not found: {}", id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        // Single connection: each in-memory connection is its own database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::schema::init_tables(&pool).await.unwrap();
        pool
    }

    fn oak() -> NewCatalogEntry {
        NewCatalogEntry {
            name: "Quercus robur".to_string(),
            leaf_shape: Some("lobed".to_string()),
            bark_texture: Some("furrowed".to_string()),
            fruit_type: Some("acorn".to_string()),
            growth_habit: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn create_and_list_sorted_by_name() {
        let pool = test_pool().await;

        create_species(&pool, oak()).await.unwrap();
        create_species(
            &pool,
            NewCatalogEntry {
                name: "Acer campestre".to_string(),
                leaf_shape: None,
                bark_texture: None,
                fruit_type: None,
                growth_habit: None,
                image_url: None,
            },
        )
        .await
        .unwrap();

        let entries = list_species(&pool).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Acer campestre");
        assert_eq!(entries[1].name, "Quercus robur");
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let pool = test_pool().await;
        create_species(&pool, oak()).await.unwrap();

        let err = create_species(&pool, oak()).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(list_species(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_name_is_invalid() {
        let pool = test_pool().await;
        let err = create_species(
            &pool,
            NewCatalogEntry {
                name: "   ".to_string(),
                leaf_shape: None,
                bark_texture: None,
                fruit_type: None,
                growth_habit: None,
                image_url: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_update_delete_round_trip() {
        let pool = test_pool().await;
        let created = create_species(&pool, oak()).await.unwrap();

        let fetched = get_species(&pool, created.id).await.unwrap();
        assert_eq!(fetched.name, "Quercus robur");

        let updated = update_species(
            &pool,
            created.id,
            CatalogEntryPatch {
                growth_habit: Some("deciduous tree".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.growth_habit.as_deref(), Some("deciduous tree"));
        // Untouched fields survive the patch
        assert_eq!(updated.leaf_shape.as_deref(), Some("lobed"));

        delete_species(&pool, created.id).await.unwrap();
        let err = delete_species(&pool, created.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let pool = test_pool().await;
        let err = get_species(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
