//! Consultation transcript summarization.
//!
//! One chat call produces a summary plus need/risk lists. A transport
//! error is fatal; a malformed model response is not — the raw text
//! becomes the summary and the lists stay empty.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chat::{ChatProvider, ChatRequest};
use crate::error::Result;
use crate::extract::extract_json;
use crate::profile::ClientProfile;

/// Structured summary of one consultation session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// One or two paragraph summary.
    #[serde(default)]
    pub summary: String,
    /// Core client needs, in model order.
    #[serde(default)]
    pub needs: Vec<String>,
    /// Risks and caveats, in model order.
    #[serde(default)]
    pub risks: Vec<String>,
}

const SYSTEM_PROMPT: &str = "너는 중소상공인 금융상담 리포트 작성 보조야. \
     반드시 JSON으로만 응답해. 추정 금지, 사실 기반으로 간결하게.";

/// Summarizes a transcript for the given client.
///
/// # Errors
///
/// Returns an error only when the chat call itself fails; an unparseable
/// response degrades to a raw-text summary.
pub async fn summarize(
    provider: &dyn ChatProvider,
    profile: &ClientProfile,
    transcript: &str,
) -> Result<SummaryResult> {
    let payload = json!({
        "client_profile": profile,
        "transcript": transcript,
        "output_schema": {
            "summary": "문단 1~2개 요약",
            "needs": ["핵심 니즈 리스트"],
            "risks": ["위험요소/유의사항 리스트(없으면 비움)"]
        }
    });

    let request = ChatRequest::new("")
        .system(SYSTEM_PROMPT)
        .user(payload.to_string());

    tracing::info!("requesting transcript summary");
    let response = provider.chat(&request).await?;

    Ok(parse_summary(&response.text))
}

/// Parses the model response, degrading to raw text on failure.
fn parse_summary(text: &str) -> SummaryResult {
    match extract_json(text).and_then(|v| serde_json::from_value::<SummaryResult>(v).ok()) {
        Some(mut result) => {
            result.summary = result.summary.trim().to_owned();
            result
        }
        None => {
            tracing::warn!("summary response contained no JSON, using raw text");
            SummaryResult {
                summary: text.to_owned(),
                needs: Vec::new(),
                risks: Vec::new(),
            }
        }
    }
}
