use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{AuditResult, HistoryEntry, TrendPoint},
    protocol::LoginRequest,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod collaborator;
pub mod error;
pub mod history;
pub mod session;
pub mod submission;

pub use collaborator::{CallPolicy, Collaborator, CollaboratorError, HttpCollaborator};
pub use error::{ClientError, ValidationError};
pub use history::{Freshness, HistoryAggregator, TrendSummary};
pub use session::{Session, SessionManager, SessionState};
pub use submission::{ManuscriptSelection, SubmissionController, SubmissionPhase};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    SessionChanged(Session),
    SubmissionPhaseChanged(SubmissionPhase),
    ResultReady(Arc<AuditResult>),
    HistoryUpdated { count: usize },
    HistoryStale,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { count: usize },
    /// The call failed and the previous cache was kept.
    Stale,
    /// The session that issued the call ended before it answered.
    Discarded,
    /// A refresh issued later had already updated the cache.
    Superseded,
}

/// Everything the views need, read under one lock so it is mutually consistent.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    pub session: Session,
    pub phase: SubmissionPhase,
    pub selected_file: Option<String>,
    pub current_result: Option<Arc<AuditResult>>,
    pub history: Arc<[HistoryEntry]>,
    pub history_freshness: Freshness,
    /// When the history cache was last replaced by a successful refresh.
    pub history_refreshed_at: Option<DateTime<Utc>>,
}

impl ClientSnapshot {
    pub fn trend(&self) -> Vec<TrendPoint> {
        history::trend(&self.history)
    }

    pub fn trend_summary(&self) -> Option<TrendSummary> {
        history::summarize(&self.history)
    }

    pub fn daily_means(&self) -> Vec<TrendPoint> {
        history::daily_means(&self.history)
    }
}

#[derive(Default)]
struct ClientState {
    session: SessionManager,
    submission: SubmissionController,
    history: HistoryAggregator,
}

/// Coordinates the session, the in-flight analysis and the history cache.
///
/// The inner lock is never held across a collaborator call; every transition is
/// validated before the call is issued and the outcome is applied only if the
/// session that issued it is still current.
pub struct ReviewClient {
    collaborator: Arc<dyn Collaborator>,
    inner: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl ReviewClient {
    pub fn new(collaborator: Arc<dyn Collaborator>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            collaborator,
            inner: Mutex::new(ClientState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    fn emit_error(&self, err: &ClientError) {
        self.emit(ClientEvent::Error(err.to_string()));
    }

    /// Signs in and performs the initial history load. Returns the display name.
    pub async fn submit_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        {
            let mut guard = self.inner.lock().await;
            if email.trim().is_empty() || password.is_empty() {
                return Err(ValidationError::MissingCredentials.into());
            }
            guard.session.begin_authentication()?;
        }
        self.emit(ClientEvent::SessionChanged(Session::default()));

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let outcome = match self.collaborator.login(&request).await {
            Ok(response) if response.is_success() => match response.user {
                Some(user) => Ok(user),
                None => Err(ClientError::ServiceUnavailable {
                    source: CollaboratorError::InvalidResponse(
                        "login succeeded without a user name".to_string(),
                    ),
                }),
            },
            Ok(response) => Err(ClientError::Auth {
                detail: format!("sign-in was not accepted (status: {})", response.status),
            }),
            Err(err) => Err(ClientError::from_login_failure(err)),
        };

        let (display_name, generation, session) = {
            let mut guard = self.inner.lock().await;
            match outcome {
                Ok(display_name) => {
                    let generation = guard.session.complete_login(display_name.clone())?;
                    guard.submission.reset();
                    guard.history.clear();
                    (display_name, generation, guard.session.snapshot())
                }
                Err(err) => {
                    guard.session.fail_login()?;
                    drop(guard);
                    warn!(error = %err, "session: sign-in failed");
                    self.emit(ClientEvent::SessionChanged(Session::default()));
                    self.emit_error(&err);
                    return Err(err);
                }
            }
        };

        info!(display_name = %display_name, "session: signed in");
        self.emit(ClientEvent::SessionChanged(session));
        self.refresh_for(generation).await;
        Ok(display_name)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        {
            let mut guard = self.inner.lock().await;
            guard.session.logout()?;
            guard.submission.reset();
            guard.history.clear();
        }
        info!("session: signed out");
        self.emit(ClientEvent::SessionChanged(Session::default()));
        self.emit(ClientEvent::SubmissionPhaseChanged(SubmissionPhase::Idle));
        Ok(())
    }

    pub async fn select_file(&self, selection: ManuscriptSelection) -> Result<(), ClientError> {
        {
            let mut guard = self.inner.lock().await;
            guard.session.require_signed_in()?;
            info!(
                file_name = selection.file_name(),
                size_bytes = selection.len(),
                "submission: manuscript selected"
            );
            guard.submission.select_file(selection)?;
        }
        self.emit(ClientEvent::SubmissionPhaseChanged(
            SubmissionPhase::FileSelected,
        ));
        Ok(())
    }

    /// Uploads the selected manuscript for analysis.
    ///
    /// On success the result becomes current before the history refresh is issued.
    pub async fn submit(&self) -> Result<Arc<AuditResult>, ClientError> {
        let (generation, manuscript) = {
            let mut guard = self.inner.lock().await;
            let generation = guard.session.require_signed_in()?;
            let manuscript = guard.submission.begin_submit()?;
            (generation, manuscript)
        };
        self.emit(ClientEvent::SubmissionPhaseChanged(
            SubmissionPhase::Submitting,
        ));

        let outcome = match self.collaborator.analyze(&manuscript).await {
            Ok(response) => AuditResult::try_from(response)
                .map_err(|err| CollaboratorError::InvalidResponse(err.to_string())),
            Err(err) => Err(err),
        };

        let mut guard = self.inner.lock().await;
        if !guard.session.is_current(generation) {
            drop(guard);
            warn!(
                file_name = manuscript.file_name(),
                "submission: discarding analysis from an ended session"
            );
            return Err(ClientError::SessionEnded);
        }

        match outcome {
            Ok(result) => {
                let result = guard.submission.complete(result)?;
                drop(guard);
                info!(
                    file_name = manuscript.file_name(),
                    score = result.score,
                    mistake_count = result.mistake_count,
                    "submission: analysis complete"
                );
                self.emit(ClientEvent::ResultReady(result.clone()));
                self.emit(ClientEvent::SubmissionPhaseChanged(
                    SubmissionPhase::Complete,
                ));
                self.refresh_for(generation).await;
                Ok(result)
            }
            Err(source) => {
                guard.submission.fail()?;
                drop(guard);
                warn!(
                    file_name = manuscript.file_name(),
                    error = %source,
                    "submission: analysis failed"
                );
                let err = ClientError::AnalysisFailure { source };
                self.emit(ClientEvent::SubmissionPhaseChanged(SubmissionPhase::Failed));
                self.emit_error(&err);
                Err(err)
            }
        }
    }

    /// Re-fetches the history list. Only fails when nobody is signed in.
    pub async fn refresh_history(&self) -> Result<RefreshOutcome, ClientError> {
        let generation = self.inner.lock().await.session.require_signed_in()?;
        Ok(self.refresh_for(generation).await)
    }

    async fn refresh_for(&self, generation: u64) -> RefreshOutcome {
        let seq = self.inner.lock().await.history.begin_refresh();
        let fetched = self.collaborator.history().await;

        let mut guard = self.inner.lock().await;
        if !guard.session.is_current(generation) {
            return RefreshOutcome::Discarded;
        }
        match fetched {
            Ok(entries) => {
                let count = entries.len();
                if !guard.history.replace_if_newer(seq, entries) {
                    drop(guard);
                    debug!(seq, "history: ignoring answer to a superseded refresh");
                    return RefreshOutcome::Superseded;
                }
                drop(guard);
                info!(count, "history: cache replaced");
                self.emit(ClientEvent::HistoryUpdated { count });
                RefreshOutcome::Updated { count }
            }
            Err(err) => {
                if !guard.history.mark_stale_if_newer(seq) {
                    drop(guard);
                    debug!(seq, error = %err, "history: superseded refresh failed");
                    return RefreshOutcome::Superseded;
                }
                drop(guard);
                warn!(error = %err, "history: refresh failed, keeping last known list");
                self.emit(ClientEvent::HistoryStale);
                RefreshOutcome::Stale
            }
        }
    }

    pub async fn snapshot(&self) -> ClientSnapshot {
        let guard = self.inner.lock().await;
        ClientSnapshot {
            session: guard.session.snapshot(),
            phase: guard.submission.phase(),
            selected_file: guard
                .submission
                .selection()
                .map(|selection| selection.file_name().to_string()),
            current_result: guard.submission.current_result(),
            history: guard.history.entries(),
            history_freshness: guard.history.freshness(),
            history_refreshed_at: guard.history.last_refreshed_at(),
        }
    }

    pub async fn session(&self) -> Session {
        self.inner.lock().await.session.snapshot()
    }

    pub async fn submission_phase(&self) -> SubmissionPhase {
        self.inner.lock().await.submission.phase()
    }

    pub async fn current_result(&self) -> Option<Arc<AuditResult>> {
        self.inner.lock().await.submission.current_result()
    }

    pub async fn history(&self) -> Arc<[HistoryEntry]> {
        self.inner.lock().await.history.entries()
    }

    pub async fn trend(&self) -> Vec<TrendPoint> {
        self.inner.lock().await.history.trend()
    }

    pub async fn history_freshness(&self) -> Freshness {
        self.inner.lock().await.history.freshness()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
