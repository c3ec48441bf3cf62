use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dataset::options::ContextOptions;
use crate::dataset::profile::ListenerProfile;
use crate::dataset::runner::{flatten_rows, DatasetRow, TrackRow};
use crate::errors::AppError;
use crate::recommend::handlers::effective_quota;
use crate::state::AppState;

/// Prompts per sweep; each one fans out to every combination.
pub const MAX_DATASET_PROMPTS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct DatasetRequest {
    pub prompts: Vec<String>,
    #[serde(default)]
    pub profile: ListenerProfile,
    pub quota: Option<usize>,
    /// Defaults to all 32 combinations.
    pub combinations: Option<Vec<ContextOptions>>,
}

#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    pub dataset_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<DatasetRow>,
    pub table: Vec<TrackRow>,
}

fn validate_prompts(prompts: &[String]) -> Result<Vec<String>, AppError> {
    let prompts: Vec<String> = prompts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if prompts.is_empty() {
        return Err(AppError::Validation(
            "at least one non-blank prompt is required".to_string(),
        ));
    }
    if prompts.len() > MAX_DATASET_PROMPTS {
        return Err(AppError::Validation(format!(
            "at most {MAX_DATASET_PROMPTS} prompts per dataset, got {}",
            prompts.len()
        )));
    }
    Ok(prompts)
}

/// POST /api/v1/datasets
pub async fn handle_create_dataset(
    State(state): State<AppState>,
    Json(req): Json<DatasetRequest>,
) -> Result<Json<DatasetResponse>, AppError> {
    let prompts = validate_prompts(&req.prompts)?;
    let quota = effective_quota(req.quota, state.config.default_quota)?;
    let combinations = match req.combinations {
        Some(c) if c.is_empty() => {
            return Err(AppError::Validation(
                "combinations must not be empty when given".to_string(),
            ))
        }
        Some(c) => c,
        None => ContextOptions::all_combinations(),
    };

    let dataset_id = Uuid::new_v4();
    tracing::info!(
        "Dataset {dataset_id}: {} prompts x {} combinations, quota {quota}",
        prompts.len(),
        combinations.len()
    );

    let rows = state
        .datasets
        .run(&prompts, &req.profile, &combinations, quota, &state.shutdown)
        .await?;
    let table = flatten_rows(&rows);

    Ok(Json(DatasetResponse {
        dataset_id,
        generated_at: Utc::now(),
        rows,
        table,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_prompts_are_dropped() {
        let prompts = validate_prompts(&["  jazz ".to_string(), " ".to_string()]).unwrap();
        assert_eq!(prompts, vec!["jazz".to_string()]);
    }

    #[test]
    fn test_no_prompts_rejected() {
        assert!(matches!(
            validate_prompts(&[" ".to_string()]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_too_many_prompts_rejected() {
        let prompts = vec!["x".to_string(); MAX_DATASET_PROMPTS + 1];
        assert!(validate_prompts(&prompts).is_err());
    }
}
