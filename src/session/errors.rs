use thiserror::Error;

use crate::services::backend::BackendError;
use crate::session::types::{QuestionKey, SessionState};

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("cannot {operation} while the session is {state}")]
    InvalidState { operation: &'static str, state: SessionState },
    #[error("question {position} is not the one on screen")]
    NotDisplayed { position: u32 },
    #[error("question {0} is still loading")]
    QuestionNotLoaded(u32),
    #[error("an answer for question {0} is still being saved")]
    AnswerInFlight(QuestionKey),
    #[error("answers are still being saved; submit again once they finish")]
    AnswersPending,
    #[error("the exam is already being submitted")]
    CompletionInFlight,
    #[error("submission must be confirmed first")]
    ConfirmationRequired,
    #[error("a pause or resume request is already in progress")]
    LifecycleInFlight,
    #[error("invalid question layout: {0}")]
    InvalidLayout(String),
    #[error("invalid session entry: {0}")]
    InvalidEntry(String),
    #[error("session could not be loaded: {0}")]
    LoadFailed(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SessionError {
    pub(crate) fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }
}
