pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::catalog::handlers as catalog;
use crate::dataset::handlers as dataset;
use crate::recommend::handlers as recommend;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/recommendations",
            post(recommend::handle_recommend),
        )
        .route("/api/v1/datasets", post(dataset::handle_create_dataset))
        .route("/api/v1/tracks/:id", get(catalog::handle_get_track))
        .with_state(state)
}
