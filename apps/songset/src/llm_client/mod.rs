/// LLM Client — the single point of entry for all text-generation calls in songset.
///
/// ARCHITECTURAL RULE: No other module may talk to a generation backend directly.
/// Backends (`OpenAiGenerator`, `OllamaGenerator`) issue exactly one request per call;
/// the retry policy lives in `GenerationClient` and nowhere else.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub mod ollama;
pub mod openai;
pub mod prompts;

/// Attempts per `generate` call, including the first.
pub const MAX_ATTEMPTS: u32 = 5;

/// Substrings that mark a backend error as a rate-limit condition.
const RATE_LIMIT_MARKERS: &[&str] = &["rate_limit_exceeded", "rate limit", "too many requests"];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// True for rate-limit-class failures: HTTP 429 or a message naming the limit.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            LlmError::Api { status, message } => *status == 429 || mentions_rate_limit(message),
            LlmError::Backend(message) => mentions_rate_limit(message),
            LlmError::Http(e) => {
                e.status().map(|s| s.as_u16()) == Some(429) || mentions_rate_limit(&e.to_string())
            }
            LlmError::Parse(_) | LlmError::EmptyContent => false,
        }
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A text-generation backend. One call = one request, no retries.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends `message` to the model and returns the raw text it produced.
    async fn complete(&self, message: &str) -> Result<String, LlmError>;

    /// Short backend name for logs, e.g. `openai:gpt-4o`.
    fn describe(&self) -> String;

    /// Cooldown applied after a rate-limit error when the operator has not set one.
    fn default_cooldown(&self) -> Duration;
}

/// Outcome of a `generate` call that did not produce text.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend failed: {0}")]
    Fatal(#[source] LlmError),

    #[error("generation failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: LlmError,
    },
}

/// Wraps a `TextGenerator` with the song-request prompt and bounded retry.
///
/// Policy:
/// - rate-limit errors sleep `cooldown`, then retry (counted against `MAX_ATTEMPTS`)
/// - empty or whitespace-only replies retry immediately
/// - every other error aborts at once
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn TextGenerator>,
    cooldown: Duration,
    max_attempts: u32,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn TextGenerator>, cooldown: Option<Duration>) -> Self {
        let cooldown = cooldown.unwrap_or_else(|| backend.default_cooldown());
        Self {
            backend,
            cooldown,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Asks the model for `count` songs matching `prompt` and returns its raw reply.
    pub async fn generate(&self, prompt: &str, count: usize) -> Result<String, GenerationError> {
        let message = prompts::song_request(prompt, count);
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=self.max_attempts {
            match self.backend.complete(&message).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(
                        "Generation succeeded on attempt {attempt} ({} chars)",
                        text.len()
                    );
                    return Ok(text);
                }
                Ok(_) => {
                    warn!(
                        "Generation attempt {attempt}/{} returned empty content",
                        self.max_attempts
                    );
                    last_error = Some(LlmError::EmptyContent);
                }
                Err(e) if e.is_rate_limited() => {
                    warn!(
                        "Generation attempt {attempt}/{} rate limited: {e}",
                        self.max_attempts
                    );
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        warn!("Cooling down for {}s before retrying", self.cooldown.as_secs());
                        tokio::time::sleep(self.cooldown).await;
                    }
                }
                Err(e) => {
                    warn!("Generation attempt {attempt} failed, not retrying: {e}");
                    return Err(GenerationError::Fatal(e));
                }
            }
        }

        Err(GenerationError::Exhausted {
            attempts: self.max_attempts,
            last: last_error.unwrap_or(LlmError::EmptyContent),
        })
    }
}
