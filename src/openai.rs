//! Client configuration for the OpenAI-compatible chat endpoint.

use crate::config::LlmSettings;
use crate::error::{PulsError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (2 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Environment variable holding the API key for both chat and embeddings.
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Read the API key from the environment.
pub fn api_key() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(PulsError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            API_KEY_ENV, API_KEY_ENV
        ))),
    }
}

/// Build a reqwest client with the given timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Create a chat client pointed at the configured API base.
pub fn create_client(settings: &LlmSettings, api_key: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(settings, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a chat client with a custom timeout.
pub fn create_client_with_timeout(
    settings: &LlmSettings,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let config = OpenAIConfig::new()
        .with_api_base(settings.api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client(timeout)?))
}
