use std::sync::Arc;

use crate::catalog::CatalogBackend;
use crate::config::Config;
use crate::dataset::runner::DatasetRunner;
use crate::recommend::cancel::CancellationToken;
use crate::recommend::engine::RecommendationEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub datasets: DatasetRunner,
    /// Direct catalog access for track lookups; recommendation goes through the engine.
    pub catalog: Arc<dyn CatalogBackend>,
    pub config: Config,
    /// Cancelled on shutdown; every engine run watches it.
    pub shutdown: CancellationToken,
}
