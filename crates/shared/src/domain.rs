use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::ProtocolError, protocol::AnalyzeResponse};

pub const MAX_SCORE: f64 = 10.0;

/// One named sub-score of an analysis (methodology, statistics, ethics, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    pub score: f64,
}

/// Outcome of one successful manuscript analysis. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditResult {
    pub score: f64,
    pub mistake_count: u32,
    pub method_text: String,
    pub stat_text: String,
    pub ai_report: String,
    pub pdf_url: Url,
    pub title: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub breakdown: Vec<CategoryScore>,
}

impl TryFrom<AnalyzeResponse> for AuditResult {
    type Error = ProtocolError;

    fn try_from(value: AnalyzeResponse) -> Result<Self, Self::Error> {
        if !value.score.is_finite() || !(0.0..=MAX_SCORE).contains(&value.score) {
            return Err(ProtocolError::ScoreOutOfRange(value.score));
        }
        let pdf_url = Url::parse(&value.pdf_url).map_err(|err| ProtocolError::InvalidReportUrl {
            url: value.pdf_url.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            score: value.score,
            mistake_count: value.mistake_count,
            method_text: value.method_text,
            stat_text: value.stat_text,
            ai_report: value.ai_report,
            pdf_url,
            title: value.title,
            date: value.date,
            status: value.status,
            breakdown: value.chart_data,
        })
    }
}

/// Persisted summary of a past audit, exactly as the collaborator lists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub title: String,
    pub score: f64,
    // Seeded records predate report generation and have no url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mistake_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A single (date, score) sample of the trend projection.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date: String,
    pub score: f64,
}

impl From<&HistoryEntry> for TrendPoint {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            date: entry.date.clone(),
            score: entry.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> AnalyzeResponse {
        AnalyzeResponse {
            score: 7.4,
            mistake_count: 3,
            method_text: "Linguistic audit identified 3 methodology flag(s).".into(),
            stat_text: "Statistics verified.".into(),
            ai_report: "Minor revisions.".into(),
            pdf_url: "http://localhost:8000/files/reviewed_draft.pdf".into(),
            title: Some("draft.pdf".into()),
            date: Some("2026-01-04".into()),
            status: None,
            chart_data: Vec::new(),
        }
    }

    #[test]
    fn converts_analyze_response_into_audit_result() {
        let result = AuditResult::try_from(sample_response()).expect("valid response");
        assert_eq!(result.score, 7.4);
        assert_eq!(result.mistake_count, 3);
        assert_eq!(result.pdf_url.path(), "/files/reviewed_draft.pdf");
        assert_eq!(result.title.as_deref(), Some("draft.pdf"));
    }

    #[test]
    fn rejects_score_outside_scale() {
        let mut response = sample_response();
        response.score = 11.2;
        assert_eq!(
            AuditResult::try_from(response),
            Err(ProtocolError::ScoreOutOfRange(11.2))
        );

        let mut response = sample_response();
        response.score = f64::NAN;
        assert!(AuditResult::try_from(response).is_err());
    }

    #[test]
    fn rejects_relative_report_url() {
        let mut response = sample_response();
        response.pdf_url = "files/reviewed_draft.pdf".into();
        let err = AuditResult::try_from(response).expect_err("relative url");
        assert!(matches!(err, ProtocolError::InvalidReportUrl { .. }));
    }

    #[test]
    fn history_entry_accepts_seed_records_without_url() {
        let raw = r#"{"id": 2, "date": "2026-01-01", "title": "Climate_Modelling_v4.pdf",
            "score": 7.2, "mistake_count": 8, "status": "Revision Needed"}"#;
        let entry: HistoryEntry = serde_json::from_str(raw).expect("seed record");
        assert_eq!(entry.pdf_url, None);
        assert_eq!(entry.mistake_count, Some(8));
        assert_eq!(TrendPoint::from(&entry).score, 7.2);
    }
}
