//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types and traits for easy access.
//!
//! # Usage
//!
//! ```rust,ignore
//! use soho::prelude::*;
//! ```

pub use crate::audio::{
    AudioFormat, SpeechToTextProvider, TranscriptionRequest, TranscriptionResponse,
};
pub use crate::chat::{ChatProvider, ChatRequest, ChatResponse, Message, Role};
pub use crate::error::{Error, LlmError, LlmErrorKind, Result};
pub use crate::openai::{LlmConfig, OpenAi};
pub use crate::pipeline::{Pipeline, RunArgs};
pub use crate::policy::{DEFAULT_CANDIDATE_LIMIT, PolicyCandidate, default_query, search_candidates};
pub use crate::profile::ClientProfile;
pub use crate::rerank::{DEFAULT_MAX_PICKS, Recommendation, rerank};
pub use crate::report::font::{FontConfig, FontSet};
pub use crate::report::pdf::render_pdf;
pub use crate::report::{EMPTY_PLACEHOLDER, ReportBundle, build_flow};
pub use crate::summary::{SummaryResult, summarize};
