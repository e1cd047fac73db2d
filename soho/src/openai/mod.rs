//! OpenAI API client (chat completions and Whisper transcription).

mod audio;
mod chat;
mod client;
mod config;

pub use client::OpenAi;
pub use config::LlmConfig;
