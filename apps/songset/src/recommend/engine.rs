//! Recommendation Engine — produces exactly `quota` distinct, catalog-verified tracks.
//!
//! Flow: Drafting (one batch request) → Parsing → Resolving each candidate →
//!       Reprompting one song at a time until the quota is met → Satisfied.
//!
//! Every request either returns exactly `quota` tracks or an error; never a partial list.
//! Work inside a request is strictly sequential.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::resolver::CatalogResolver;
use crate::llm_client::prompts::rejection_clause;
use crate::llm_client::{GenerationClient, GenerationError};
use crate::recommend::cancel::CancellationToken;
use crate::recommend::models::{Candidate, CandidateKey, RecommendationRequest, ResolvedTrack};
use crate::recommend::parser;
use crate::recommend::rejection::{RejectionSet, DEFAULT_REJECTION_BOUND};

pub const DEFAULT_MAX_REPROMPTS: u32 = 50;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("quota must be at least 1")]
    InvalidQuota,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("gave up after {reprompts} re-prompts with {accepted}/{quota} tracks resolved")]
    RepromptsExhausted {
        reprompts: u32,
        accepted: usize,
        quota: usize,
    },

    #[error("recommendation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Single-song follow-up requests allowed per recommendation.
    pub max_reprompts: u32,
    /// See `RejectionSet`.
    pub rejection_bound: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_reprompts: DEFAULT_MAX_REPROMPTS,
            rejection_bound: DEFAULT_REJECTION_BOUND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Drafting,
    Parsing,
    Resolving,
    Reprompting,
    Satisfied,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Drafting => "drafting",
            Stage::Parsing => "parsing",
            Stage::Resolving => "resolving",
            Stage::Reprompting => "reprompting",
            Stage::Satisfied => "satisfied",
        };
        f.write_str(name)
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Accepted,
    Duplicate,
    Missing,
    Skipped,
}

/// Per-request working state. Dropped when the request finishes.
struct Run {
    quota: usize,
    stage: Stage,
    tracks: Vec<ResolvedTrack>,
    accepted_keys: HashSet<CandidateKey>,
    accepted_ids: HashSet<String>,
    rejections: RejectionSet,
}

impl Run {
    fn new(quota: usize, rejection_bound: usize) -> Self {
        Self {
            quota,
            stage: Stage::Drafting,
            tracks: Vec::with_capacity(quota),
            accepted_keys: HashSet::new(),
            accepted_ids: HashSet::new(),
            rejections: RejectionSet::new(rejection_bound),
        }
    }

    fn enter(&mut self, stage: Stage) {
        if self.stage != stage {
            debug!("Recommendation {} -> {stage}", self.stage);
            self.stage = stage;
        }
    }

    fn is_satisfied(&self) -> bool {
        self.tracks.len() >= self.quota
    }

    /// Adds `track` unless its id or either key is already present.
    fn accept(&mut self, candidate_key: CandidateKey, track: ResolvedTrack) -> bool {
        let track_key = track.key();
        if self.accepted_ids.contains(&track.id)
            || self.accepted_keys.contains(&candidate_key)
            || self.accepted_keys.contains(&track_key)
        {
            return false;
        }
        self.accepted_ids.insert(track.id.clone());
        self.accepted_keys.insert(candidate_key);
        self.accepted_keys.insert(track_key);
        self.tracks.push(track);
        true
    }
}

pub struct RecommendationEngine {
    generator: GenerationClient,
    resolver: Arc<CatalogResolver>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(
        generator: GenerationClient,
        resolver: Arc<CatalogResolver>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            generator,
            resolver,
            settings,
        }
    }

    pub fn resolver(&self) -> &Arc<CatalogResolver> {
        &self.resolver
    }

    pub fn generator_name(&self) -> String {
        self.generator.describe()
    }

    /// Runs one request to completion.
    ///
    /// `cancel` is checked before the first request and at the top of every
    /// resolve / re-prompt iteration.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResolvedTrack>, RecommendError> {
        if request.quota == 0 {
            return Err(RecommendError::InvalidQuota);
        }
        let mut run = Run::new(request.quota, self.settings.rejection_bound);
        info!(
            "Recommending {} tracks via {}",
            request.quota,
            self.generator.describe()
        );

        if cancel.is_cancelled() {
            return Err(RecommendError::Cancelled);
        }
        let raw = self
            .generator
            .generate(&request.base_prompt, request.quota)
            .await?;

        run.enter(Stage::Parsing);
        let batch = parser::parse(&raw);
        info!("First draft offered {} candidates", batch.len());

        run.enter(Stage::Resolving);
        for candidate in batch {
            if cancel.is_cancelled() {
                return Err(RecommendError::Cancelled);
            }
            if run.is_satisfied() {
                break;
            }
            self.consider(&mut run, candidate).await;
        }

        let mut reprompts = 0u32;
        while !run.is_satisfied() {
            run.enter(Stage::Reprompting);
            if cancel.is_cancelled() {
                return Err(RecommendError::Cancelled);
            }
            if reprompts >= self.settings.max_reprompts {
                warn!(
                    "Re-prompt budget of {} spent with {}/{} tracks",
                    self.settings.max_reprompts,
                    run.tracks.len(),
                    run.quota
                );
                return Err(RecommendError::RepromptsExhausted {
                    reprompts,
                    accepted: run.tracks.len(),
                    quota: run.quota,
                });
            }
            reprompts += 1;

            let prompt = format!(
                "{}{}",
                request.base_prompt,
                rejection_clause(run.rejections.labels_for_prompt())
            );
            info!(
                "Re-prompt {reprompts}: {}/{} tracks, {} songs excluded",
                run.tracks.len(),
                run.quota,
                run.rejections.len()
            );
            let raw = self.generator.generate(&prompt, 1).await?;

            run.enter(Stage::Parsing);
            let Some(candidate) = parser::parse_single(&raw) else {
                continue;
            };
            run.enter(Stage::Resolving);
            let verdict = self.consider(&mut run, candidate).await;
            debug!("Re-prompt {reprompts} outcome: {verdict:?}");
        }

        run.enter(Stage::Satisfied);
        info!(
            "Recommendation satisfied with {} tracks after {reprompts} re-prompts",
            run.tracks.len()
        );
        Ok(run.tracks)
    }

    async fn consider(&self, run: &mut Run, candidate: Candidate) -> Verdict {
        let key = candidate.key();
        let verdict = if run.accepted_keys.contains(&key) {
            debug!("Already accepted, skipping: {}", candidate.label());
            Verdict::Duplicate
        } else {
            self.resolve_into(run, key, &candidate).await
        };

        if verdict != Verdict::Skipped {
            run.rejections.insert(&candidate);
        }
        verdict
    }

    async fn resolve_into(&self, run: &mut Run, key: CandidateKey, candidate: &Candidate) -> Verdict {
        match self
            .resolver
            .resolve(&candidate.title, &candidate.artist)
            .await
        {
            Ok(Some(track)) => {
                if run.accept(key, track) {
                    Verdict::Accepted
                } else {
                    debug!("Resolved to an already accepted track: {}", candidate.label());
                    Verdict::Duplicate
                }
            }
            Ok(None) => Verdict::Missing,
            Err(e) => {
                warn!("Catalog lookup failed for {}, skipping: {e}", candidate.label());
                Verdict::Skipped
            }
        }
    }
}
