//! Dataset Runner — sweeps prompts × context-option combinations through the engine.
//!
//! Combinations run one after another. A combination that fails is recorded as a row
//! carrying the error and no tracks; the sweep moves on. Cancellation stops the sweep.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::options::ContextOptions;
use crate::dataset::profile::{compose_prompt, ListenerProfile};
use crate::recommend::cancel::CancellationToken;
use crate::recommend::engine::{RecommendError, RecommendationEngine};
use crate::recommend::models::{RecommendationRequest, ResolvedTrack};

/// One prompt under one option combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRow {
    pub prompt: String,
    pub options: ContextOptions,
    pub tracks: Vec<ResolvedTrack>,
    pub error: Option<String>,
}

/// Flat, one-track-per-row form of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub prompt: String,
}

impl DatasetRow {
    pub fn flatten(&self) -> Vec<TrackRow> {
        self.tracks
            .iter()
            .map(|track| TrackRow {
                artist: track.artist.clone(),
                title: track.title.clone(),
                album: track.album.clone(),
                prompt: self.prompt.clone(),
            })
            .collect()
    }
}

pub fn flatten_rows(rows: &[DatasetRow]) -> Vec<TrackRow> {
    rows.iter().flat_map(DatasetRow::flatten).collect()
}

#[derive(Clone)]
pub struct DatasetRunner {
    engine: Arc<RecommendationEngine>,
}

impl DatasetRunner {
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self { engine }
    }

    /// Runs every prompt under each of `combinations`, in order.
    pub async fn run(
        &self,
        prompts: &[String],
        profile: &ListenerProfile,
        combinations: &[ContextOptions],
        quota: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<DatasetRow>, RecommendError> {
        let mut rows = Vec::with_capacity(prompts.len() * combinations.len());

        for (index, prompt) in prompts.iter().enumerate() {
            info!(
                "Dataset prompt {}/{}: '{prompt}' across {} combinations",
                index + 1,
                prompts.len(),
                combinations.len()
            );

            for options in combinations {
                if cancel.is_cancelled() {
                    return Err(RecommendError::Cancelled);
                }
                let request =
                    RecommendationRequest::new(compose_prompt(prompt, profile, options), quota);

                let row = match self.engine.recommend(&request, cancel).await {
                    Ok(tracks) => DatasetRow {
                        prompt: prompt.clone(),
                        options: *options,
                        tracks,
                        error: None,
                    },
                    Err(e @ (RecommendError::Cancelled | RecommendError::InvalidQuota)) => {
                        return Err(e)
                    }
                    Err(e) => {
                        warn!(
                            "Combination {:?} failed for '{prompt}': {e}",
                            options.enabled_names()
                        );
                        DatasetRow {
                            prompt: prompt.clone(),
                            options: *options,
                            tracks: Vec::new(),
                            error: Some(e.to_string()),
                        }
                    }
                };
                rows.push(row);
            }
        }

        info!("Dataset sweep produced {} rows", rows.len());
        Ok(rows)
    }
}
