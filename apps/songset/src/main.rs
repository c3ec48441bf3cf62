mod catalog;
mod config;
mod dataset;
mod errors;
mod llm_client;
mod recommend;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::resolver::CatalogResolver;
use crate::catalog::spotify::SpotifyCatalog;
use crate::config::{Config, GenerationBackend};
use crate::dataset::runner::DatasetRunner;
use crate::llm_client::ollama::OllamaGenerator;
use crate::llm_client::openai::OpenAiGenerator;
use crate::llm_client::{GenerationClient, TextGenerator};
use crate::recommend::cancel::CancellationToken;
use crate::recommend::engine::RecommendationEngine;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting songset v{}", env!("CARGO_PKG_VERSION"));

    // Initialize generation backend
    let backend = build_generator(&config).await?;
    let generator = GenerationClient::new(backend, config.rate_limit_cooldown);
    info!("Generation client initialized ({})", generator.describe());

    // Initialize catalog + resolver (resolver cache is shared by every request)
    let catalog = Arc::new(
        SpotifyCatalog::new(config.spotify_access_token.clone())
            .context("Failed to build Spotify client")?,
    );
    let resolver = Arc::new(CatalogResolver::new(catalog.clone()));

    let engine = Arc::new(RecommendationEngine::new(
        generator,
        resolver,
        config.engine_settings(),
    ));
    info!(
        "Engine ready: max {} re-prompts, rejection bound {}",
        config.max_reprompts, config.rejection_bound
    );

    let shutdown = CancellationToken::new();

    // Build app state
    let state = AppState {
        datasets: DatasetRunner::new(engine.clone()),
        engine,
        catalog,
        config: config.clone(),
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

/// Builds the configured backend. An unreachable Ollama runtime is logged, not fatal.
async fn build_generator(config: &Config) -> Result<Arc<dyn TextGenerator>> {
    match &config.generation {
        GenerationBackend::OpenAi { api_key, model } => Ok(Arc::new(
            OpenAiGenerator::new(api_key.clone(), model.clone())
                .context("Failed to build OpenAI client")?,
        )),
        GenerationBackend::Ollama {
            url,
            model,
            num_ctx,
        } => {
            let ollama = OllamaGenerator::new(url.clone(), model.clone(), *num_ctx)
                .context("Failed to build Ollama client")?;
            if let Err(e) = ollama.probe().await {
                warn!("Ollama at {url} did not answer the version probe: {e}");
            }
            Ok(Arc::new(ollama))
        }
    }
}

/// Resolves on Ctrl-C after cancelling every in-flight engine run.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested; cancelling in-flight recommendations");
    shutdown.cancel();
}
