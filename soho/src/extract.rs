//! Best-effort JSON extraction from free-form model output.
//!
//! Language models asked for "JSON only" still wrap their answer in prose
//! or code fences often enough that every caller needs the same salvage
//! logic. [`extract_json`] applies three strategies in order and returns
//! `None` when none of them yields a parseable object, leaving the
//! degrade-vs-fail decision to the caller.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn fenced_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
        Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap()
    })
}

fn fenced_any_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
        Regex::new(r"(?s)```\s*(\{.*?\})\s*```").unwrap()
    })
}

/// Extracts the first JSON object found in `text`.
///
/// Strategies, in order:
/// 1. parse the whole text directly
/// 2. parse the contents of a ```json fenced block, then any fenced block
/// 3. parse the span from the first `{` to the last `}`
#[must_use]
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    let fenced = fenced_json_re()
        .captures(text)
        .or_else(|| fenced_any_re().captures(text));
    if let Some(caps) = fenced {
        if let Ok(value) = serde_json::from_str::<Value>(&caps[1]) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end]).ok()
}
