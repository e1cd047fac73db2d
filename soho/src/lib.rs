//! Soho - consultation report generation for small-business finance
//!
//! This crate turns a recorded consulting session into a structured PDF
//! report: the audio is transcribed, summarized by a language model,
//! matched against a local policy database, and the best policy
//! recommendations are reranked before the report is rendered.

pub mod audio;
pub mod chat;
pub mod error;
pub mod extract;
pub mod openai;
pub mod pipeline;
pub mod policy;
pub mod prelude;
pub mod profile;
pub mod rerank;
pub mod report;
pub mod summary;

pub use error::{Error, LlmError, Result};
