use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::HistoryEntry,
    error::ErrorBody,
    protocol::{
        AnalyzeResponse, LoginRequest, LoginResponse, ANALYZE_FILE_FIELD, ANALYZE_PATH,
        HISTORY_PATH, LOGIN_PATH,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::submission::ManuscriptSelection;

const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HISTORY_RETRIES: u32 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollaboratorError {
    #[error("collaborator unreachable: {0}")]
    Unreachable(String),
    #[error("collaborator did not answer within {0:?}")]
    TimedOut(Duration),
    #[error("collaborator rejected request with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("unexpected collaborator response: {0}")]
    InvalidResponse(String),
    #[error("could not build collaborator request: {0}")]
    InvalidRequest(String),
}

impl CollaboratorError {
    /// Failures where the collaborator never produced an answer.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::TimedOut(_))
    }
}

/// Timeout and retry policy for the three collaborator calls.
///
/// `None` timeouts wait for as long as the collaborator takes. Login and analyze are
/// never retried; history is retried `history_retries` times on connectivity failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPolicy {
    pub login_timeout: Option<Duration>,
    pub analyze_timeout: Option<Duration>,
    pub history_timeout: Option<Duration>,
    pub history_retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            login_timeout: None,
            analyze_timeout: None,
            history_timeout: Some(DEFAULT_HISTORY_TIMEOUT),
            history_retries: DEFAULT_HISTORY_RETRIES,
        }
    }
}

/// The remote analysis service: login, analyze and history.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, CollaboratorError>;
    async fn analyze(
        &self,
        manuscript: &ManuscriptSelection,
    ) -> Result<AnalyzeResponse, CollaboratorError>;
    async fn history(&self) -> Result<Vec<HistoryEntry>, CollaboratorError>;
}

pub struct HttpCollaborator {
    http: Client,
    server_url: String,
    policy: CallPolicy,
}

impl HttpCollaborator {
    pub fn new(server_url: &str, policy: CallPolicy) -> Result<Self, CollaboratorError> {
        let parsed = Url::parse(server_url.trim()).map_err(|err| {
            CollaboratorError::InvalidRequest(format!("invalid server url '{server_url}': {err}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CollaboratorError::InvalidRequest(format!(
                "server url '{server_url}' must use http or https"
            )));
        }

        Ok(Self {
            http: Client::new(),
            server_url: parsed.as_str().trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    async fn send(
        request: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<Response, CollaboratorError> {
        let request = match timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|err| classify_transport_error(err, timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|body| body.message())
            .ok()
            .filter(|detail| !detail.is_empty())
            .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(CollaboratorError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CollaboratorError> {
        let body = response
            .bytes()
            .await
            .map_err(|err| CollaboratorError::Unreachable(err.to_string()))?;
        serde_json::from_slice(&body)
            .map_err(|err| CollaboratorError::InvalidResponse(err.to_string()))
    }

    async fn history_once(&self) -> Result<Vec<HistoryEntry>, CollaboratorError> {
        let response = Self::send(
            self.http.get(self.endpoint(HISTORY_PATH)),
            self.policy.history_timeout,
        )
        .await?;
        Self::decode(response).await
    }
}

fn classify_transport_error(err: reqwest::Error, timeout: Option<Duration>) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::TimedOut(timeout.unwrap_or_default())
    } else if err.is_builder() {
        CollaboratorError::InvalidRequest(err.to_string())
    } else {
        CollaboratorError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl Collaborator for HttpCollaborator {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, CollaboratorError> {
        info!(server_url = %self.server_url, "collaborator: login request");
        let response = Self::send(
            self.http.post(self.endpoint(LOGIN_PATH)).json(request),
            self.policy.login_timeout,
        )
        .await?;
        Self::decode(response).await
    }

    async fn analyze(
        &self,
        manuscript: &ManuscriptSelection,
    ) -> Result<AnalyzeResponse, CollaboratorError> {
        let mut part = Part::bytes(manuscript.content().to_vec())
            .file_name(manuscript.file_name().to_string());
        if let Some(mime_type) = manuscript.mime_type() {
            part = part
                .mime_str(mime_type)
                .map_err(|err| CollaboratorError::InvalidRequest(err.to_string()))?;
        }
        let form = Form::new().part(ANALYZE_FILE_FIELD, part);

        info!(
            file_name = manuscript.file_name(),
            size_bytes = manuscript.len(),
            "collaborator: analyze request"
        );
        let response = Self::send(
            self.http.post(self.endpoint(ANALYZE_PATH)).multipart(form),
            self.policy.analyze_timeout,
        )
        .await?;
        Self::decode(response).await
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, CollaboratorError> {
        let mut attempt = 0;
        loop {
            match self.history_once().await {
                Ok(entries) => {
                    debug!(count = entries.len(), attempt, "collaborator: history fetched");
                    return Ok(entries);
                }
                Err(err) if err.is_connectivity() && attempt < self.policy.history_retries => {
                    attempt += 1;
                    warn!(error = %err, attempt, "collaborator: retrying history request");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/collaborator_tests.rs"]
mod tests;
