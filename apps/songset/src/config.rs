use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::recommend::engine::{EngineSettings, DEFAULT_MAX_REPROMPTS};
use crate::recommend::handlers::MAX_QUOTA;
use crate::recommend::rejection::DEFAULT_REJECTION_BOUND;

/// Which text-generation backend the service talks to.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationBackend {
    OpenAi { api_key: String, model: String },
    Ollama { url: String, model: String, num_ctx: u32 },
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationBackend,
    pub spotify_access_token: String,
    pub default_quota: usize,
    pub max_reprompts: u32,
    pub rejection_bound: usize,
    /// Overrides the backend's own rate-limit cooldown when set.
    pub rate_limit_cooldown: Option<Duration>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let generation = match optional_env("GENERATION_BACKEND")
            .unwrap_or_else(|| "openai".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "openai" => GenerationBackend::OpenAi {
                api_key: require_env("OPENAI_API_KEY")?,
                model: optional_env("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            },
            "ollama" => GenerationBackend::Ollama {
                url: optional_env("OLLAMA_URL")
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                model: optional_env("OLLAMA_MODEL")
                    .unwrap_or_else(|| "deepseek-r1:1.5b".to_string()),
                num_ctx: parse_env("OLLAMA_NUM_CTX", 4096)?,
            },
            other => bail!("GENERATION_BACKEND must be 'openai' or 'ollama', got '{other}'"),
        };

        let default_quota = check_default_quota(parse_env("DEFAULT_QUOTA", 5)?)?;

        Ok(Config {
            generation,
            spotify_access_token: require_env("SPOTIFY_ACCESS_TOKEN")?,
            default_quota,
            max_reprompts: parse_env("MAX_REPROMPTS", DEFAULT_MAX_REPROMPTS)?,
            rejection_bound: parse_env("REJECTION_BOUND", DEFAULT_REJECTION_BOUND)?,
            rate_limit_cooldown: optional_env("RATE_LIMIT_COOLDOWN_SECS")
                .map(|v| {
                    v.parse::<u64>()
                        .map(Duration::from_secs)
                        .context("RATE_LIMIT_COOLDOWN_SECS must be a whole number of seconds")
                })
                .transpose()?,
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_reprompts: self.max_reprompts,
            rejection_bound: self.rejection_bound,
        }
    }
}

/// The default must itself be a quota a request may ask for.
fn check_default_quota(quota: usize) -> Result<usize> {
    if quota == 0 || quota > MAX_QUOTA {
        bail!("DEFAULT_QUOTA must be between 1 and {MAX_QUOTA}, got {quota}");
    }
    Ok(quota)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_default_when_unset() {
        let value: u32 = parse_env("SONGSET_TEST_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("SONGSET_TEST_BAD_NUMBER", "lots");
        let result: Result<u16> = parse_env("SONGSET_TEST_BAD_NUMBER", 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_quota_must_fit_request_bounds() {
        assert_eq!(check_default_quota(5).unwrap(), 5);
        assert_eq!(check_default_quota(MAX_QUOTA).unwrap(), MAX_QUOTA);
        assert!(check_default_quota(0).is_err());
        assert!(check_default_quota(MAX_QUOTA + 1).is_err());
    }

    #[test]
    fn test_engine_settings_follow_config() {
        let config = Config {
            generation: GenerationBackend::Ollama {
                url: "http://localhost:11434".to_string(),
                model: "deepseek-r1:1.5b".to_string(),
                num_ctx: 4096,
            },
            spotify_access_token: "token".to_string(),
            default_quota: 5,
            max_reprompts: 7,
            rejection_bound: 12,
            rate_limit_cooldown: None,
            port: 8080,
            rust_log: "info".to_string(),
        };
        let settings = config.engine_settings();
        assert_eq!(settings.max_reprompts, 7);
        assert_eq!(settings.rejection_bound, 12);
    }
}
