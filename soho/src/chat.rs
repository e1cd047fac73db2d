//! Provider-agnostic chat types.
//!
//! The pipeline makes at most two chat calls per run (summarize, rerank),
//! both single-shot and non-streaming, so the surface here is deliberately
//! small: messages in, first-choice text out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier; empty means "use the client default".
    pub model: String,
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Creates an empty request for the given model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
        }
    }

    /// Appends a system message.
    #[must_use]
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Appends a user message.
    #[must_use]
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Assistant message text from the first choice.
    pub text: String,
    /// Model that produced the response, when reported.
    pub model: Option<String>,
}

impl ChatResponse {
    /// Creates a response from plain text.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }
}

/// A chat completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends one chat request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns a provider error when the backend call fails.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
