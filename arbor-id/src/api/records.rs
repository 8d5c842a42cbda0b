//! History and collection endpoints
//!
//! The ledger fills itself from completed identifications; the collection
//! is mutated only by these explicit add/remove calls. A duplicate add is
//! a user-facing notice (200 with `added: false`), not an error.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::records::CollectionAddOutcome;
use crate::types::IdentificationRecord;
use crate::AppState;

/// Build record-store routes
pub fn records_routes() -> Router<AppState> {
    Router::new()
        .route("/api/history", get(get_history))
        .route("/api/collection", get(get_collection).post(add_to_collection))
        .route("/api/collection/:scientific_name", delete(remove_from_collection))
}

/// GET /api/history (newest to oldest)
pub async fn get_history(State(state): State<AppState>) -> ApiResult<Json<Vec<IdentificationRecord>>> {
    let history = state.records.history().await?;
    Ok(Json(history))
}

/// GET /api/collection (most recently added first)
pub async fn get_collection(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<IdentificationRecord>>> {
    let collection = state.records.collection().await?;
    Ok(Json(collection))
}

/// POST /api/collection
///
/// Promote an identification into the collection. Duplicates leave the
/// existing entry untouched.
pub async fn add_to_collection(
    State(state): State<AppState>,
    Json(record): Json<IdentificationRecord>,
) -> ApiResult<Response> {
    if record.scientific_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Record has no scientific name".to_string(),
        ));
    }

    let outcome = state.records.add_to_collection(record).await?;
    let body = match outcome {
        CollectionAddOutcome::Added => json!({ "added": true }),
        CollectionAddOutcome::AlreadyPresent { scientific_name } => json!({
            "added": false,
            "already_exists": true,
            "scientific_name": scientific_name,
        }),
    };

    Ok((StatusCode::OK, Json(body)).into_response())
}

/// DELETE /api/collection/{scientific_name}
///
/// Idempotent: removing an absent species still succeeds.
pub async fn remove_from_collection(
    State(state): State<AppState>,
    Path(scientific_name): Path<String>,
) -> ApiResult<StatusCode> {
    state.records.remove_from_collection(&scientific_name).await?;
    Ok(StatusCode::NO_CONTENT)
}
