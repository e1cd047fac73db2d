//! OpenAI API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{LlmError, Result};

use super::config::LlmConfig;

/// OpenAI error response.
#[derive(Debug, Clone, Deserialize)]
struct OpenAiErrorResponse {
    pub error: OpenAiError,
}

/// OpenAI error details.
#[derive(Debug, Clone, Deserialize)]
struct OpenAiError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: Option<String>,
}

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAi {
    pub(crate) config: Arc<LlmConfig>,
    pub(crate) client: Client,
}

impl OpenAi {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails when the API key is empty or the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::auth("openai", "API key is required").into());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Creates a client from environment variables.
    ///
    /// # Errors
    ///
    /// Fails when `OPENAI_API_KEY` is unset or the client cannot be built.
    pub fn from_env() -> Result<Self> {
        let config = LlmConfig::from_env()?;
        Self::new(config)
    }

    /// The default chat model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// The speech-to-text model.
    #[must_use]
    pub fn stt_model(&self) -> &str {
        &self.config.stt_model
    }

    /// Builds the chat completions URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Builds the audio transcriptions URL.
    pub(crate) fn transcriptions_url(&self) -> String {
        format!("{}/audio/transcriptions", self.config.base_url)
    }

    /// Builds request headers for JSON requests.
    pub(crate) fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
    }

    /// Builds request headers for multipart requests.
    pub(crate) fn build_multipart_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    /// Parses an error response body from OpenAI.
    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error = error_response.error;
            let code = error.code.unwrap_or_else(|| error.error_type.clone());

            return match status {
                401 => LlmError::auth("openai", error.message),
                429 => LlmError::rate_limited("openai"),
                400 => LlmError::invalid_request(error.message),
                _ => LlmError::provider_code("openai", code, error.message),
            };
        }

        LlmError::http_status(status, body.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::LlmErrorKind;

    #[test]
    fn new_rejects_empty_api_key() {
        assert!(OpenAi::new(LlmConfig::new("")).is_err());
    }

    #[test]
    fn urls_are_built_from_base_url() {
        let client = OpenAi::new(LlmConfig::new("k").with_base_url("http://localhost:1"))
            .unwrap();
        assert_eq!(client.chat_url(), "http://localhost:1/chat/completions");
        assert_eq!(
            client.transcriptions_url(),
            "http://localhost:1/audio/transcriptions"
        );
    }

    #[test]
    fn parse_error_maps_auth() {
        let body = r#"{"error": {"message": "bad key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        let err = OpenAi::parse_error(401, body);
        assert_eq!(err.kind, LlmErrorKind::Auth);
        assert!(err.message.contains("bad key"));
    }

    #[test]
    fn parse_error_maps_rate_limit() {
        let body = r#"{"error": {"message": "slow down", "type": "rate_limit_error", "code": null}}"#;
        let err = OpenAi::parse_error(429, body);
        assert_eq!(err.kind, LlmErrorKind::RateLimited);
    }

    #[test]
    fn parse_error_falls_back_to_http_status() {
        let err = OpenAi::parse_error(502, "<html>bad gateway</html>");
        assert_eq!(err.kind, LlmErrorKind::HttpStatus);
        assert_eq!(err.code.as_deref(), Some("502"));
    }
}
