//! OpenAI `ChatProvider` implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatProvider, ChatRequest, ChatResponse, Message, Role};
use crate::error::{LlmError, Result};

use super::client::OpenAi;

/// OpenAI chat completion request body.
#[derive(Debug, Clone, Serialize)]
struct OpenAiChatRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// OpenAI message wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    pub role: String,
    pub content: Option<String>,
}

/// OpenAI chat completion response body.
#[derive(Debug, Clone, Deserialize)]
struct OpenAiChatResponse {
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub model: Option<String>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoice {
    pub message: OpenAiMessage,
}

impl OpenAi {
    fn convert_message(msg: &Message) -> OpenAiMessage {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        OpenAiMessage {
            role: role.to_owned(),
            content: Some(msg.content.clone()),
        }
    }

    fn build_body(&self, request: &ChatRequest) -> OpenAiChatRequest {
        let model = if request.model.is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };

        OpenAiChatRequest {
            model,
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
        }
    }

    fn parse_response(response: OpenAiChatResponse) -> Result<ChatResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::response_format("at least one choice", "empty choices"))?;

        Ok(ChatResponse {
            text: choice.message.content.unwrap_or_default(),
            model: response.model,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAi {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.chat_url();
        let body = self.build_body(request);

        let response = self
            .build_request(&url)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let response_text = response.text().await.map_err(LlmError::from)?;
        let parsed: OpenAiChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            LlmError::response_format(
                "valid OpenAI response",
                format!("parse error: {e}, response: {response_text}"),
            )
        })?;

        Self::parse_response(parsed)
    }
}
