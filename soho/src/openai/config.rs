//! OpenAI client configuration.

use crate::error::{LlmError, Result};

/// Configuration for the OpenAI client.
///
/// Built once at startup and handed to [`super::OpenAi`]; nothing in the
/// pipeline reads the process environment after this point.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Model used for summarize/rerank chat calls.
    pub model: String,
    /// Model used for speech-to-text.
    pub stt_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Default OpenAI API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    /// Default chat model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    /// Default speech-to-text model.
    pub const DEFAULT_STT_MODEL: &'static str = "whisper-1";
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            stt_model: Self::DEFAULT_STT_MODEL.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - Required API key
    /// - `OPENAI_BASE_URL` - Optional base URL
    /// - `LLM_MODEL` - Optional chat model
    ///
    /// # Errors
    ///
    /// Fails when `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::auth("openai", "OPENAI_API_KEY environment variable not set"))?;

        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_owned());

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_owned());

        Ok(Self {
            api_key,
            base_url,
            model,
            stt_model: Self::DEFAULT_STT_MODEL.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the speech-to-text model.
    #[must_use]
    pub fn with_stt_model(mut self, model: impl Into<String>) -> Self {
        self.stt_model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = LlmConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, LlmConfig::DEFAULT_BASE_URL);
        assert_eq!(config.model, LlmConfig::DEFAULT_MODEL);
        assert_eq!(config.stt_model, LlmConfig::DEFAULT_STT_MODEL);
    }

    #[test]
    fn test_config_builder() {
        let config = LlmConfig::new("key")
            .with_model("gpt-4o")
            .with_stt_model("gpt-4o-transcribe")
            .with_timeout(30);

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.stt_model, "gpt-4o-transcribe");
        assert_eq!(config.timeout_secs, Some(30));
    }
}
