//! Scripted in-memory backends shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{CatalogBackend, CatalogError, CatalogTrack};
use crate::llm_client::{LlmError, TextGenerator};
use crate::recommend::cancel::CancellationToken;
use crate::recommend::models::CandidateKey;

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    RateLimited,
    Fatal(&'static str),
}

impl Reply {
    pub fn text(body: &str) -> Self {
        Reply::Text(body.to_string())
    }
}

/// Replays a fixed list of replies and records every message it was sent.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, message: &str) -> Result<String, LlmError> {
        self.messages.lock().unwrap().push(message.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(body)) => Ok(body),
            Some(Reply::RateLimited) => Err(LlmError::Api {
                status: 429,
                message: "rate_limit_exceeded: slow down".to_string(),
            }),
            Some(Reply::Fatal(message)) => Err(LlmError::Api {
                status: 401,
                message: message.to_string(),
            }),
            None => Err(LlmError::Backend("script exhausted".to_string())),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn default_cooldown(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// Catalog keyed by normalized (title, artist) with per-key search counters.
#[derive(Default)]
pub struct FakeCatalog {
    tracks: HashMap<CandidateKey, CatalogTrack>,
    failing: Mutex<HashSet<CandidateKey>>,
    searches: Mutex<HashMap<CandidateKey, usize>>,
    search_delay: Option<Duration>,
    cancel_on: HashMap<CandidateKey, CancellationToken>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, title: &str, artist: &str, id: &str) -> Self {
        self.tracks.insert(
            CandidateKey::new(title, artist),
            CatalogTrack {
                id: id.to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
                album: format!("{title} (album)"),
                external_url: Some(format!("https://open.spotify.com/track/{id}")),
            },
        );
        self
    }

    /// The next search for this key fails with a transport error.
    pub fn failing_once(self, title: &str, artist: &str) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(CandidateKey::new(title, artist));
        self
    }

    /// Every search sleeps this long before answering.
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    /// Searching this key cancels `token`, mid-request.
    pub fn cancelling_on(mut self, title: &str, artist: &str, token: &CancellationToken) -> Self {
        self.cancel_on
            .insert(CandidateKey::new(title, artist), token.clone());
        self
    }

    pub fn searches_for(&self, title: &str, artist: &str) -> usize {
        self.searches
            .lock()
            .unwrap()
            .get(&CandidateKey::new(title, artist))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_searches(&self) -> usize {
        self.searches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl CatalogBackend for FakeCatalog {
    async fn search_track(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let key = CandidateKey::new(title, artist);
        *self.searches.lock().unwrap().entry(key.clone()).or_default() += 1;
        if let Some(token) = self.cancel_on.get(&key) {
            token.cancel();
        }
        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().remove(&key) {
            return Err(CatalogError::Api {
                status: 503,
                message: "catalog unavailable".to_string(),
            });
        }
        Ok(self.tracks.get(&key).cloned().into_iter().collect())
    }

    async fn get_track(&self, id: &str) -> Result<CatalogTrack, CatalogError> {
        self.tracks
            .values()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

/// JSON array reply body for `(title, artist)` pairs.
pub fn batch_json(songs: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = songs
        .iter()
        .map(|(title, artist)| {
            serde_json::json!({ "title": title, "artist": artist, "album": "" })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// JSON object reply body for one song.
pub fn single_json(title: &str, artist: &str) -> String {
    serde_json::json!({ "title": title, "artist": artist, "album": "" }).to_string()
}

/// `AppState` wired to scripted backends; `catalog` serves both the engine and track lookups.
pub fn test_state(
    generator: std::sync::Arc<ScriptedGenerator>,
    catalog: std::sync::Arc<FakeCatalog>,
) -> crate::state::AppState {
    use std::sync::Arc;

    use crate::catalog::resolver::CatalogResolver;
    use crate::config::{Config, GenerationBackend};
    use crate::dataset::runner::DatasetRunner;
    use crate::llm_client::GenerationClient;
    use crate::recommend::cancel::CancellationToken;
    use crate::recommend::engine::RecommendationEngine;

    let config = Config {
        generation: GenerationBackend::Ollama {
            url: "http://localhost:11434".to_string(),
            model: "test".to_string(),
            num_ctx: 4096,
        },
        spotify_access_token: "token".to_string(),
        default_quota: 2,
        max_reprompts: 5,
        rejection_bound: 30,
        rate_limit_cooldown: Some(Duration::from_secs(1)),
        port: 0,
        rust_log: "debug".to_string(),
    };
    let engine = Arc::new(RecommendationEngine::new(
        GenerationClient::new(generator, config.rate_limit_cooldown),
        Arc::new(CatalogResolver::new(catalog.clone())),
        config.engine_settings(),
    ));
    crate::state::AppState {
        datasets: DatasetRunner::new(engine.clone()),
        engine,
        catalog,
        config,
        shutdown: CancellationToken::new(),
    }
}
