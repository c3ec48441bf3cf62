//! Local model backend over Ollama's HTTP generation endpoint.
//!
//! Reasoning models (deepseek-r1 and friends) wrap their chain of thought in
//! `<think>…</think>`; that text is dropped before the reply leaves this module.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{LlmError, TextGenerator};

const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);
const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Appended to every message; small local models drift from JSON without it.
const FORMAT_HINT: &str =
    "\nOnly JSON format as output, follow this template {\"title\": \"\", \"artist\": \"\", \"album\": \"\"}";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_ctx: u32,
}

/// One NDJSON line of a streamed `/api/generate` reply.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    num_ctx: u32,
}

impl OllamaGenerator {
    pub fn new(base_url: String, model: String, num_ctx: u32) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            num_ctx,
        })
    }

    /// Checks the runtime is reachable and returns its version string.
    pub async fn probe(&self) -> Result<String, LlmError> {
        let response = self
            .client
            .get(format!("{}/api/version", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        let version: VersionResponse = response.json().await?;
        info!("Ollama runtime reachable (version {})", version.version);
        Ok(version.version)
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn complete(&self, message: &str) -> Result<String, LlmError> {
        let request_body = GenerateRequest {
            model: &self.model,
            prompt: format!("{message}{FORMAT_HINT}"),
            options: GenerateOptions {
                num_ctx: self.num_ctx,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let raw = collect_stream(&body)?;
        debug!("Ollama streamed {} chars", raw.len());
        Ok(strip_think_blocks(&raw))
    }

    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn default_cooldown(&self) -> Duration {
        RATE_LIMIT_COOLDOWN
    }
}

/// Joins the `response` fragments of an NDJSON stream. Undecodable lines are skipped.
fn collect_stream(body: &str) -> Result<String, LlmError> {
    let mut text = String::new();
    for line in body.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(chunk) = serde_json::from_str::<GenerateChunk>(line) else {
            continue;
        };
        if let Some(error) = chunk.error {
            return Err(LlmError::Backend(error));
        }
        if let Some(fragment) = chunk.response {
            text.push_str(&fragment);
        }
    }
    Ok(text)
}

/// Removes every `<think>…</think>` block. An unclosed block swallows the rest.
fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(THINK_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(end) => rest = &after_open[end + THINK_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}
