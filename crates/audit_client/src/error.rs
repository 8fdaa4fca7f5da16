use thiserror::Error;

use crate::collaborator::CollaboratorError;

/// Precondition failures. These are decided locally and never reach the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("email and password are both required")]
    MissingCredentials,
    #[error("already signed in as {0}")]
    AlreadySignedIn(String),
    #[error("a sign-in attempt is already in progress")]
    SignInInProgress,
    #[error("not signed in")]
    NotSignedIn,
    #[error("no manuscript selected; choose a file before submitting")]
    NoFileSelected,
    #[error("this manuscript has already been analyzed; select a file to run a new audit")]
    AlreadySubmitted,
    #[error("an analysis is already in progress")]
    SubmissionInProgress,
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// Errors surfaced to the reviewer. None of them leave the client in an invalid state.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{detail}")]
    Auth { detail: String },
    #[error("analysis service unavailable; please try again later")]
    ServiceUnavailable {
        #[source]
        source: CollaboratorError,
    },
    #[error("manuscript analysis failed; please retry")]
    AnalysisFailure {
        #[source]
        source: CollaboratorError,
    },
    #[error("the session ended before the request completed")]
    SessionEnded,
}

impl ClientError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Maps a failed login call onto the auth/unavailable split.
    ///
    /// Any HTTP answer carries a detail worth showing; only a collaborator that never
    /// answered, or answered with an undecodable body, is unavailable.
    pub(crate) fn from_login_failure(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Rejected { detail, .. } => Self::Auth { detail },
            other => Self::ServiceUnavailable { source: other },
        }
    }
}
