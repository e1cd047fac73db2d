//! Candidate reranking and recommendation rationale.
//!
//! One chat call asks the model to pick and justify at most `max_picks`
//! of the searched candidates. An empty candidate list never reaches the
//! model, and an unparseable response degrades to no recommendations.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chat::{ChatProvider, ChatRequest};
use crate::error::Result;
use crate::extract::extract_json;
use crate::policy::PolicyCandidate;
use crate::profile::ClientProfile;

/// Default cap on recommendations per report.
pub const DEFAULT_MAX_PICKS: usize = 3;

/// A ranked, justified policy recommendation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Source policy row id, when the model echoed it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Program name.
    pub name: String,
    /// Loan limit, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    /// Interest rate, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    /// Repayment terms, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repayment: Option<String>,
    /// Matched eligibility conditions.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Required documents.
    #[serde(default)]
    pub documents: Vec<String>,
    /// Why this program was recommended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Program URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Data source label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Wire shape of one model-returned pick; field names the model tends to
/// use vary, so both `reason` and `rationale` are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
struct RecommendationWire {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    limit: Option<String>,
    #[serde(default)]
    rate: Option<String>,
    #[serde(default)]
    repayment: Option<String>,
    #[serde(default)]
    conditions: Vec<String>,
    #[serde(default)]
    documents: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl From<RecommendationWire> for Recommendation {
    fn from(wire: RecommendationWire) -> Self {
        Self {
            id: wire.id,
            name: wire
                .name
                .or(wire.title)
                .unwrap_or_else(|| "추천 항목".to_owned()),
            limit: wire.limit,
            rate: wire.rate,
            repayment: wire.repayment,
            conditions: wire.conditions,
            documents: wire.documents,
            rationale: wire.reason.or(wire.rationale),
            url: wire.url,
            source: wire.source,
        }
    }
}

fn system_prompt(max_picks: usize) -> String {
    format!(
        "너는 KB 소호컨설팅 금융 상담 보조 에이전트다. \
         입력 후보 중에서 최대 {max_picks}개를 추천한다. \
         각 추천에는 reason(추천 이유)과 matchedConditions(충족 조건 키워드)를 포함한다. \
         사실 근거가 없는 항목은 제외한다. 반드시 JSON으로만 응답한다."
    )
}

/// Asks the model to select and justify up to `max_picks` candidates.
///
/// Returns an empty list without any external call when `candidates` is
/// empty. Unparseable responses degrade to an empty list.
///
/// # Errors
///
/// Only transport errors from the chat call propagate.
pub async fn rerank(
    provider: &dyn ChatProvider,
    profile: &ClientProfile,
    candidates: &[PolicyCandidate],
    max_picks: usize,
) -> Result<Vec<Recommendation>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let projected: Vec<_> = candidates
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.title,
                "region": c.region,
                "industry": c.industry,
                "period": c.period,
                "conditions": c.conditions,
                "url": c.url,
                "source": c.source,
            })
        })
        .collect();

    let payload = json!({
        "userContext": profile,
        "candidates": projected,
        "output_schema": { "recommendations": [] }
    });

    let request = ChatRequest::new("")
        .system(system_prompt(max_picks))
        .user(payload.to_string());

    tracing::info!(candidates = candidates.len(), "requesting recommendation rerank");
    let response = provider.chat(&request).await?;

    Ok(parse_recommendations(&response.text, max_picks))
}

/// Parses the rerank response, degrading to empty on failure.
fn parse_recommendations(text: &str, max_picks: usize) -> Vec<Recommendation> {
    let Some(value) = extract_json(text) else {
        tracing::warn!("rerank response contained no JSON, returning no recommendations");
        return Vec::new();
    };

    let Some(items) = value.get("recommendations").and_then(|v| v.as_array()) else {
        tracing::warn!("rerank response missing 'recommendations' array");
        return Vec::new();
    };

    items
        .iter()
        .take(max_picks)
        .filter_map(|item| {
            serde_json::from_value::<RecommendationWire>(item.clone())
                .ok()
                .map(Recommendation::from)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::chat::tests_support::MockChat;

    fn sample_profile() -> ClientProfile {
        ClientProfile {
            name: None,
            email: None,
            biz_type: "요식업".into(),
            region: "부산".into(),
            biz_age_months: 24,
            credit_score: Some(750),
            purpose: Some("운전자금".into()),
        }
    }

    fn sample_candidate(id: i64, title: &str) -> PolicyCandidate {
        PolicyCandidate {
            id,
            title: title.to_owned(),
            region: Some("부산".into()),
            industry: Some("요식업".into()),
            ..PolicyCandidate::default()
        }
    }

    mod empty_candidates {
        use super::*;

        #[tokio::test]
        async fn returns_empty_without_calling_provider() {
            let mock = MockChat::new(vec![]);
            let recs = rerank(&mock, &sample_profile(), &[], DEFAULT_MAX_PICKS)
                .await
                .unwrap();
            assert!(recs.is_empty());
            assert_eq!(mock.calls(), 0);
        }
    }

    mod parse_recommendations {
        use super::*;

        #[test]
        fn maps_fields_and_prefers_reason() {
            let text = r#"{"recommendations": [{
                "id": 7,
                "name": "부산 요식업 특례보증",
                "limit": "최대 5천만원",
                "rate": "연 2.5%",
                "conditions": ["업력 1년 이상"],
                "documents": ["사업자등록증"],
                "reason": "지역/업종 모두 충족",
                "rationale": "무시되어야 함",
                "url": "https://example.com",
                "source": "sbiz24"
            }]}"#;

            let recs = parse_recommendations(text, 3);
            assert_eq!(recs.len(), 1);
            let rec = &recs[0];
            assert_eq!(rec.id, Some(7));
            assert_eq!(rec.name, "부산 요식업 특례보증");
            assert_eq!(rec.rationale.as_deref(), Some("지역/업종 모두 충족"));
            assert_eq!(rec.conditions, vec!["업력 1년 이상"]);
        }

        #[test]
        fn falls_back_to_rationale_then_title() {
            let text = r#"{"recommendations": [
                {"title": "이름은 title에", "rationale": "rationale만 있음"}
            ]}"#;
            let recs = parse_recommendations(text, 3);
            assert_eq!(recs[0].name, "이름은 title에");
            assert_eq!(recs[0].rationale.as_deref(), Some("rationale만 있음"));
        }

        #[test]
        fn truncates_to_max_picks_preserving_order() {
            let text = r#"{"recommendations": [
                {"name": "1"}, {"name": "2"}, {"name": "3"}, {"name": "4"}, {"name": "5"}
            ]}"#;
            let recs = parse_recommendations(text, 3);
            assert_eq!(recs.len(), 3);
            assert_eq!(recs[0].name, "1");
            assert_eq!(recs[2].name, "3");
        }

        #[test]
        fn max_picks_is_configurable() {
            let text = r#"{"recommendations": [{"name": "1"}, {"name": "2"}]}"#;
            assert_eq!(parse_recommendations(text, 1).len(), 1);
            assert_eq!(parse_recommendations(text, 5).len(), 2);
        }

        #[test]
        fn non_json_degrades_to_empty() {
            assert!(parse_recommendations("추천할 수 없습니다.", 3).is_empty());
        }

        #[test]
        fn missing_recommendations_key_degrades_to_empty() {
            assert!(parse_recommendations(r#"{"picks": []}"#, 3).is_empty());
        }
    }

    mod rerank_call {
        use super::*;

        #[tokio::test]
        async fn sends_projected_candidates() {
            let mock = MockChat::new(vec![
                r#"{"recommendations": [{"id": 1, "name": "부산 요식업 지원", "reason": "적합"}]}"#
                    .into(),
            ]);
            let candidates = vec![sample_candidate(1, "부산 요식업 지원")];

            let recs = rerank(&mock, &sample_profile(), &candidates, DEFAULT_MAX_PICKS)
                .await
                .unwrap();
            assert_eq!(recs.len(), 1);
            assert_eq!(mock.calls(), 1);

            let request = mock.last_request().unwrap();
            assert!(request.messages[0].content.contains("최대 3개"));
            assert!(request.messages[1].content.contains("부산 요식업 지원"));
        }

        #[tokio::test]
        async fn transport_error_propagates() {
            let mock = MockChat::failing();
            let candidates = vec![sample_candidate(1, "x")];
            assert!(
                rerank(&mock, &sample_profile(), &candidates, DEFAULT_MAX_PICKS)
                    .await
                    .is_err()
            );
        }

        #[tokio::test]
        async fn degraded_response_yields_empty_not_error() {
            let mock = MockChat::new(vec!["JSON 아님".into()]);
            let candidates = vec![sample_candidate(1, "x")];
            let recs = rerank(&mock, &sample_profile(), &candidates, DEFAULT_MAX_PICKS)
                .await
                .unwrap();
            assert!(recs.is_empty());
        }
    }
}
