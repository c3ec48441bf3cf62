use axum::{
    extract::{Path, State},
    Json,
};

use crate::catalog::CatalogTrack;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/tracks/:id
pub async fn handle_get_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogTrack>, AppError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::Validation("track id must not be blank".to_string()));
    }
    let track = state.catalog.get_track(id).await?;
    Ok(Json(track))
}
