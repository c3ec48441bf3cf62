use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version, the generation backend and resolver cache sizes.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let (resolved, unresolved) = state.engine.resolver().cache_sizes().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "songset",
        "generator": state.engine.generator_name(),
        "catalog_cache": {
            "resolved": resolved,
            "unresolved": unresolved
        }
    }))
}
