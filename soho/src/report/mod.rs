//! Report assembly and rendering.
//!
//! Rendering is split in two: [`build_flow`] turns a [`ReportBundle`]
//! into a pure, inspectable sequence of [`Flow`] elements, and the
//! [`pdf`] encoder turns that sequence into a paginated PDF. Only the
//! encoder touches fonts or bytes, so layout is unit-testable.

pub mod font;
pub mod pdf;

use serde::Serialize;

use crate::profile::ClientProfile;
use crate::rerank::Recommendation;
use crate::summary::SummaryResult;

/// Placeholder shown for empty need/risk lists.
pub const EMPTY_PLACEHOLDER: &str = "(없음)";

/// Everything one report needs, fully assembled before rendering starts.
#[derive(Debug, Clone, Serialize)]
pub struct ReportBundle {
    /// The client the report is for.
    pub client: ClientProfile,
    /// Consultation timestamp, preformatted (`%Y-%m-%d %H:%M`).
    pub consulted_at: String,
    /// Session summary text.
    pub summary: String,
    /// Core client needs.
    pub needs: Vec<String>,
    /// Risks and caveats.
    pub risks: Vec<String>,
    /// Ranked recommendations, at most `max_picks`.
    pub recommendations: Vec<Recommendation>,
}

impl ReportBundle {
    /// Assembles a bundle from the pipeline's intermediate results.
    #[must_use]
    pub fn new(
        client: ClientProfile,
        consulted_at: String,
        summary: SummaryResult,
        recommendations: Vec<Recommendation>,
    ) -> Self {
        Self {
            client,
            consulted_at,
            summary: summary.summary,
            needs: summary.needs,
            risks: summary.risks,
            recommendations,
        }
    }
}

/// A table in the flow: fixed column widths in millimeters, rows of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowTable {
    /// Column widths in millimeters.
    pub col_widths_mm: Vec<f32>,
    /// Whether the first row is a header row.
    pub header: bool,
    /// Cell text; embedded `\n` produce line breaks.
    pub rows: Vec<Vec<String>>,
}

/// One layout element of the report, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Document title.
    Title(String),
    /// Bold section heading.
    Heading(String),
    /// Body paragraph; embedded `\n` produce line breaks.
    Paragraph(String),
    /// Bulleted list, one bullet per entry.
    Bullets(Vec<String>),
    /// A bordered table.
    Table(FlowTable),
}

fn format_opt(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => "-".to_owned(),
    }
}

fn bullets_or_placeholder(items: &[String]) -> Vec<String> {
    if items.is_empty() {
        vec![EMPTY_PLACEHOLDER.to_owned()]
    } else {
        items.to_vec()
    }
}

/// Lays the bundle out as a flat flow of elements.
#[must_use]
pub fn build_flow(bundle: &ReportBundle) -> Vec<Flow> {
    let mut flow = Vec::new();
    let c = &bundle.client;

    flow.push(Flow::Title("상담 리포트".to_owned()));

    let credit = c
        .credit_score
        .map_or_else(|| "-".to_owned(), |s| s.to_string());
    flow.push(Flow::Table(FlowTable {
        col_widths_mm: vec![25.0, 60.0, 25.0, 60.0],
        header: false,
        rows: vec![
            vec![
                "업종".to_owned(),
                c.biz_type.clone(),
                "지역".to_owned(),
                c.region.clone(),
            ],
            vec![
                "업력".to_owned(),
                format!("{}년 ({}개월)", c.biz_age_years(), c.biz_age_months),
                "신용점수".to_owned(),
                credit,
            ],
            vec![
                "이름".to_owned(),
                format_opt(c.name.as_deref()),
                "이메일".to_owned(),
                format_opt(c.email.as_deref()),
            ],
            vec![
                "상담 일시".to_owned(),
                bundle.consulted_at.clone(),
                "용도".to_owned(),
                format_opt(c.purpose.as_deref()),
            ],
        ],
    }));

    flow.push(Flow::Heading("[요약]".to_owned()));
    flow.push(Flow::Paragraph(bundle.summary.clone()));

    flow.push(Flow::Heading("[요구사항]".to_owned()));
    flow.push(Flow::Bullets(bullets_or_placeholder(&bundle.needs)));

    flow.push(Flow::Heading("[위험/유의사항]".to_owned()));
    flow.push(Flow::Bullets(bullets_or_placeholder(&bundle.risks)));

    if !bundle.recommendations.is_empty() {
        flow.push(Flow::Heading("[추천 정책]".to_owned()));
        flow.push(Flow::Table(recommendations_table(&bundle.recommendations)));
    }

    flow
}

fn recommendations_table(recommendations: &[Recommendation]) -> FlowTable {
    let mut rows = vec![vec![
        "#".to_owned(),
        "정책명".to_owned(),
        "한도/금리/상환".to_owned(),
        "조건/필요서류".to_owned(),
        "근거".to_owned(),
    ]];

    for (i, r) in recommendations.iter().enumerate() {
        let terms: Vec<&str> = [r.limit.as_deref(), r.rate.as_deref(), r.repayment.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let terms = terms.join(" / ");

        let mut cond_doc = Vec::new();
        if !r.conditions.is_empty() {
            cond_doc.push(format!("조건: {}", r.conditions.join(", ")));
        }
        if !r.documents.is_empty() {
            cond_doc.push(format!("서류: {}", r.documents.join(", ")));
        }
        let cond_doc = cond_doc.join("\n");

        let name = match r.url.as_deref() {
            Some(url) if !url.is_empty() => format!("{}\n{url}", r.name),
            _ => r.name.clone(),
        };

        rows.push(vec![
            (i + 1).to_string(),
            name,
            if terms.is_empty() { "-".to_owned() } else { terms },
            if cond_doc.is_empty() {
                "-".to_owned()
            } else {
                cond_doc
            },
            format_opt(r.rationale.as_deref()),
        ]);
    }

    FlowTable {
        col_widths_mm: vec![10.0, 45.0, 45.0, 50.0, 40.0],
        header: true,
        rows,
    }
}
