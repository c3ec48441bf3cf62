use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::recommend::models::{RecommendationRequest, ResolvedTrack};
use crate::state::AppState;

/// Largest quota a single HTTP request may ask for.
pub const MAX_QUOTA: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
    pub prompt: String,
    pub quota: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub request_id: Uuid,
    pub prompt: String,
    pub quota: usize,
    pub tracks: Vec<ResolvedTrack>,
}

/// Quota from the body, else the configured default; rejects 0 and anything above `MAX_QUOTA`.
pub fn effective_quota(requested: Option<usize>, default: usize) -> Result<usize, AppError> {
    let quota = requested.unwrap_or(default);
    if quota == 0 || quota > MAX_QUOTA {
        return Err(AppError::Validation(format!(
            "quota must be between 1 and {MAX_QUOTA}, got {quota}"
        )));
    }
    Ok(quota)
}

/// POST /api/v1/recommendations
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendBody>,
) -> Result<Json<RecommendResponse>, AppError> {
    let prompt = req.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::Validation("prompt must not be blank".to_string()));
    }
    let quota = effective_quota(req.quota, state.config.default_quota)?;
    let request_id = Uuid::new_v4();
    tracing::info!("Recommendation {request_id}: quota {quota} for '{prompt}'");

    let request = RecommendationRequest::new(prompt.clone(), quota);
    let tracks = state.engine.recommend(&request, &state.shutdown).await?;

    Ok(Json(RecommendResponse {
        request_id,
        prompt,
        quota,
        tracks,
    }))
}
