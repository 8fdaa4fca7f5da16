use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Body the collaborator attaches to non-2xx responses.
///
/// `detail` is usually a plain string ("Invalid Credentials") but request validation
/// failures carry a structured list, so it is kept as raw JSON until rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Value::String(detail.into()),
        }
    }

    /// Human readable form of `detail`.
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(text) => text.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("score {0} is outside the 0-10 range")]
    ScoreOutOfRange(f64),
    #[error("invalid report url '{url}': {reason}")]
    InvalidReportUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_string_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "Invalid Credentials"}"#).expect("decode");
        assert_eq!(body.message(), "Invalid Credentials");
    }

    #[test]
    fn renders_validation_detail_list() {
        let raw = r#"{"detail": [
            {"loc": ["body", "email"], "msg": "field required", "type": "missing"},
            {"loc": ["body", "password"], "msg": "field required", "type": "missing"}
        ]}"#;
        let body: ErrorBody = serde_json::from_str(raw).expect("decode");
        assert_eq!(body.message(), "field required; field required");
    }
}
