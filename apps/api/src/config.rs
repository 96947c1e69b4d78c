use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_MODELS: &str = "claude-sonnet-4-5,claude-haiku-4-5";

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed numbers fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Blank or unset disables the AI-assisted parser.
    pub anthropic_api_key: Option<String>,
    pub llm_models: Vec<String>,
    pub llm_timeout: Duration,
    pub fetch_timeout: Duration,
    pub fetch_max_redirects: usize,
    pub fetch_max_body_bytes: usize,
    pub expose_error_details: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let fetch_timeout_secs: u64 = parse_env("FETCH_TIMEOUT_SECS", 25)?;
        let fetch_max_redirects: usize = parse_env("FETCH_MAX_REDIRECTS", 5)?;

        Ok(Config {
            anthropic_api_key: parse_api_key(std::env::var("ANTHROPIC_API_KEY").ok()),
            llm_models: parse_models(
                &std::env::var("LLM_MODELS").unwrap_or_else(|_| DEFAULT_MODELS.to_string()),
            ),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 30)?),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs.clamp(5, 60)),
            fetch_max_redirects: fetch_max_redirects.min(10),
            fetch_max_body_bytes: parse_env("FETCH_MAX_BODY_BYTES", 2 * 1024 * 1024)?,
            expose_error_details: parse_env("EXPOSE_ERROR_DETAILS", false)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

/// Whitespace-only keys are treated as unset.
fn parse_api_key(raw: Option<String>) -> Option<String> {
    raw.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

/// Comma-separated, order preserved, blanks dropped. Falls back to the defaults when empty.
fn parse_models(raw: &str) -> Vec<String> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if models.is_empty() {
        parse_models(DEFAULT_MODELS)
    } else {
        models
    }
}
