use serde::{Deserialize, Serialize};

use crate::domain::CategoryScore;

pub const LOGIN_PATH: &str = "/login";
pub const ANALYZE_PATH: &str = "/analyze";
pub const HISTORY_PATH: &str = "/history";
/// Name of the multipart field carrying the manuscript bytes.
pub const ANALYZE_FILE_FIELD: &str = "file";
pub const LOGIN_SUCCESS_STATUS: &str = "success";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: String,
    #[serde(default)]
    pub user: Option<String>,
}

impl LoginResponse {
    pub fn is_success(&self) -> bool {
        self.status == LOGIN_SUCCESS_STATUS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub score: f64,
    pub mistake_count: u32,
    pub method_text: String,
    pub stat_text: String,
    pub ai_report: String,
    pub pdf_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chart_data: Vec<CategoryScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_uses_wire_field_names() {
        let body = serde_json::to_value(LoginRequest {
            email: "a@b.edu".into(),
            password: "secret123".into(),
        })
        .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({"email": "a@b.edu", "password": "secret123"})
        );
    }

    #[test]
    fn analyze_response_ignores_unknown_fields() {
        let raw = r#"{"id": 5, "date": "2026-01-04", "title": "draft.pdf",
            "pdf_url": "http://localhost:8000/files/reviewed_draft.pdf",
            "mistake_count": 3, "ai_report": "ok", "score": 7.4,
            "method_text": "m", "stat_text": "s", "status": "Approved",
            "chart_data": [{"name": "Method", "score": 8}]}"#;
        let response: AnalyzeResponse = serde_json::from_str(raw).expect("decode");
        assert_eq!(response.mistake_count, 3);
        assert_eq!(response.chart_data.len(), 1);
        assert_eq!(response.chart_data[0].score, 8.0);
    }

    #[test]
    fn login_status_other_than_success_is_not_accepted() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"status": "pending"}"#).expect("decode");
        assert!(!response.is_success());
    }
}
