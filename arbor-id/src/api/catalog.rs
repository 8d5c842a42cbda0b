//! Species catalog endpoints
//!
//! Reads are public; mutations are gated by the `X-Admin-Secret` header
//! matched against the configured shared secret. The gate keeps casual
//! visitors out of the admin surface; it is not an authentication system.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::db::species::{self, CatalogEntry, CatalogEntryPatch, NewCatalogEntry};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header carrying the admin shared secret
const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Build catalog routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/species", get(list_species).post(create_species))
        .route(
            "/api/species/:id",
            get(get_species).put(update_species).delete(delete_species),
        )
}

/// Check the admin gate for catalog mutations
fn require_admin(headers: &HeaderMap, state: &AppState) -> ApiResult<()> {
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(secret) if secret == state.admin_secret => Ok(()),
        Some(_) => Err(ApiError::Unauthorized("Incorrect admin secret".to_string())),
        None => Err(ApiError::Unauthorized(
            "Missing X-Admin-Secret header".to_string(),
        )),
    }
}

/// GET /api/species (all entries, sorted by name)
pub async fn list_species(State(state): State<AppState>) -> ApiResult<Json<Vec<CatalogEntry>>> {
    let entries = species::list_species(&state.db).await?;
    Ok(Json(entries))
}

/// GET /api/species/{id}
pub async fn get_species(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CatalogEntry>> {
    let entry = species::get_species(&state.db, id).await?;
    Ok(Json(entry))
}

/// POST /api/species (admin)
pub async fn create_species(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewCatalogEntry>,
) -> ApiResult<Response> {
    require_admin(&headers, &state)?;

    let entry = species::create_species(&state.db, new).await?;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

/// PUT /api/species/{id} (admin)
pub async fn update_species(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(patch): Json<CatalogEntryPatch>,
) -> ApiResult<Json<CatalogEntry>> {
    require_admin(&headers, &state)?;

    let entry = species::update_species(&state.db, id, patch).await?;
    Ok(Json(entry))
}

/// DELETE /api/species/{id} (admin)
pub async fn delete_species(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_admin(&headers, &state)?;

    species::delete_species(&state.db, id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Species deleted" }))).into_response())
}
