use std::sync::Arc;

use shared::domain::AuditResult;

use crate::error::ValidationError;

/// A picked manuscript. Replaced wholesale on every new pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManuscriptSelection {
    file_name: String,
    mime_type: Option<String>,
    content: Arc<[u8]>,
}

impl ManuscriptSelection {
    pub fn new(file_name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            content: content.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    FileSelected,
    Submitting,
    Complete,
    Failed,
}

impl SubmissionPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FileSelected => "file selected",
            Self::Submitting => "submitting",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// Lifecycle of one manuscript analysis at a time, plus the current result.
#[derive(Debug)]
pub struct SubmissionController {
    phase: SubmissionPhase,
    selection: Option<ManuscriptSelection>,
    current: Option<Arc<AuditResult>>,
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self {
            phase: SubmissionPhase::Idle,
            selection: None,
            current: None,
        }
    }
}

impl SubmissionController {
    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub fn selection(&self) -> Option<&ManuscriptSelection> {
        self.selection.as_ref()
    }

    pub fn current_result(&self) -> Option<Arc<AuditResult>> {
        self.current.clone()
    }

    pub fn select_file(&mut self, selection: ManuscriptSelection) -> Result<(), ValidationError> {
        if self.phase == SubmissionPhase::Submitting {
            return Err(ValidationError::SubmissionInProgress);
        }
        self.selection = Some(selection);
        self.phase = SubmissionPhase::FileSelected;
        Ok(())
    }

    /// Moves to `Submitting` and hands back the manuscript to upload.
    ///
    /// `Failed` re-uses the selection that failed; `Complete` needs a fresh pick.
    pub fn begin_submit(&mut self) -> Result<ManuscriptSelection, ValidationError> {
        match self.phase {
            SubmissionPhase::Submitting => Err(ValidationError::SubmissionInProgress),
            SubmissionPhase::Idle => Err(ValidationError::NoFileSelected),
            SubmissionPhase::Complete => Err(ValidationError::AlreadySubmitted),
            SubmissionPhase::FileSelected | SubmissionPhase::Failed => {
                let selection = self
                    .selection
                    .clone()
                    .ok_or(ValidationError::NoFileSelected)?;
                self.phase = SubmissionPhase::Submitting;
                Ok(selection)
            }
        }
    }

    pub fn complete(&mut self, result: AuditResult) -> Result<Arc<AuditResult>, ValidationError> {
        self.expect_submitting("complete submission")?;
        let result = Arc::new(result);
        self.current = Some(result.clone());
        self.phase = SubmissionPhase::Complete;
        Ok(result)
    }

    pub fn fail(&mut self) -> Result<(), ValidationError> {
        self.expect_submitting("fail submission")?;
        self.phase = SubmissionPhase::Failed;
        Ok(())
    }

    /// Drops the selection and the current result. Used at session boundaries.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn expect_submitting(&self, action: &'static str) -> Result<(), ValidationError> {
        if self.phase == SubmissionPhase::Submitting {
            Ok(())
        } else {
            Err(ValidationError::InvalidTransition {
                action,
                state: self.phase.label(),
            })
        }
    }
}
