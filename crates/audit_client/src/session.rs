//! Authentication state machine: `LoggedOut -> Authenticating -> LoggedIn`.
//!
//! Every session boundary bumps a generation counter. Work started under one generation
//! must not write its outcome once the generation has moved on.

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    LoggedIn { display_name: String },
}

impl SessionState {
    fn label(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged out",
            Self::Authenticating => "authenticating",
            Self::LoggedIn { .. } => "logged in",
        }
    }
}

/// Read-only view of the session handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub display_name: Option<String>,
    pub authenticated: bool,
}

#[derive(Debug)]
pub struct SessionManager {
    state: SessionState,
    generation: u64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self {
            state: SessionState::LoggedOut,
            generation: 0,
        }
    }
}

impl SessionManager {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn { .. })
    }

    pub fn display_name(&self) -> Option<&str> {
        match &self.state {
            SessionState::LoggedIn { display_name } => Some(display_name),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Session {
        Session {
            display_name: self.display_name().map(str::to_string),
            authenticated: self.is_authenticated(),
        }
    }

    pub fn begin_authentication(&mut self) -> Result<(), ValidationError> {
        match &self.state {
            SessionState::LoggedOut => {
                self.state = SessionState::Authenticating;
                Ok(())
            }
            SessionState::Authenticating => Err(ValidationError::SignInInProgress),
            SessionState::LoggedIn { display_name } => {
                Err(ValidationError::AlreadySignedIn(display_name.clone()))
            }
        }
    }

    /// Enters `LoggedIn` and returns the generation of the new session.
    pub fn complete_login(&mut self, display_name: String) -> Result<u64, ValidationError> {
        self.expect_authenticating("complete sign-in")?;
        self.generation += 1;
        self.state = SessionState::LoggedIn { display_name };
        Ok(self.generation)
    }

    pub fn fail_login(&mut self) -> Result<(), ValidationError> {
        self.expect_authenticating("fail sign-in")?;
        self.state = SessionState::LoggedOut;
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), ValidationError> {
        if !self.is_authenticated() {
            return Err(ValidationError::NotSignedIn);
        }
        self.generation += 1;
        self.state = SessionState::LoggedOut;
        Ok(())
    }

    /// Gate for every other component. Returns the active generation.
    pub fn require_signed_in(&self) -> Result<u64, ValidationError> {
        if self.is_authenticated() {
            Ok(self.generation)
        } else {
            Err(ValidationError::NotSignedIn)
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.is_authenticated() && self.generation == generation
    }

    fn expect_authenticating(&self, action: &'static str) -> Result<(), ValidationError> {
        if self.state == SessionState::Authenticating {
            Ok(())
        } else {
            Err(ValidationError::InvalidTransition {
                action,
                state: self.state.label(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_flow_reaches_logged_in_with_collaborator_name() {
        let mut session = SessionManager::default();
        session.begin_authentication().expect("begin");
        assert_eq!(session.state(), &SessionState::Authenticating);

        let generation = session.complete_login("Dr. Lin".into()).expect("complete");
        assert_eq!(session.display_name(), Some("Dr. Lin"));
        assert_eq!(session.require_signed_in(), Ok(generation));
        assert_eq!(
            session.snapshot(),
            Session {
                display_name: Some("Dr. Lin".into()),
                authenticated: true,
            }
        );
    }

    #[test]
    fn failed_login_returns_to_logged_out() {
        let mut session = SessionManager::default();
        session.begin_authentication().expect("begin");
        session.fail_login().expect("fail");
        assert_eq!(session.state(), &SessionState::LoggedOut);
        assert_eq!(session.require_signed_in(), Err(ValidationError::NotSignedIn));
    }

    #[test]
    fn credentials_only_accepted_from_logged_out() {
        let mut session = SessionManager::default();
        session.begin_authentication().expect("begin");
        assert_eq!(
            session.begin_authentication(),
            Err(ValidationError::SignInInProgress)
        );

        session.complete_login("Lin".into()).expect("complete");
        assert_eq!(
            session.begin_authentication(),
            Err(ValidationError::AlreadySignedIn("Lin".into()))
        );
    }

    #[test]
    fn logout_requires_logged_in_and_bumps_generation() {
        let mut session = SessionManager::default();
        assert_eq!(session.logout(), Err(ValidationError::NotSignedIn));

        session.begin_authentication().expect("begin");
        let first = session.complete_login("Lin".into()).expect("complete");
        session.logout().expect("logout");
        assert!(!session.is_current(first));

        session.begin_authentication().expect("begin again");
        let second = session.complete_login("Lin".into()).expect("complete again");
        assert_ne!(first, second);
        assert!(session.is_current(second));
        assert!(!session.is_current(first));
    }

    #[test]
    fn completing_without_pending_attempt_is_rejected() {
        let mut session = SessionManager::default();
        let err = session.complete_login("Lin".into()).expect_err("no attempt");
        assert_eq!(
            err,
            ValidationError::InvalidTransition {
                action: "complete sign-in",
                state: "logged out",
            }
        );
    }
}
