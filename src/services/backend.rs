use async_trait::async_trait;
use thiserror::Error;

use crate::schemas::exam::{
    CompleteExamResponse, FetchQuestionResponse, ResumeExamResponse, StartChapterTestResponse,
    StartExamResponse, SubmitAnswerRequest,
};
use crate::session::types::{QuestionKey, SubmissionId};

#[derive(Debug, Error)]
pub(crate) enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend rejected the request (status {status}): {detail}")]
    Status { status: u16, detail: String },
    #[error("backend returned an unexpected payload: {0}")]
    Decode(String),
}

impl BackendError {
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }
}

/// Remote store of exercises, submissions and scores. Every call is a suspension point;
/// none of them is retried here.
#[async_trait]
pub(crate) trait ExamBackend: Send + Sync {
    async fn start_exam(
        &self,
        exercise_id: &str,
        user_id: &str,
    ) -> Result<StartExamResponse, BackendError>;

    async fn start_chapter_test(
        &self,
        chapter_id: &str,
        user_id: &str,
    ) -> Result<StartChapterTestResponse, BackendError>;

    async fn fetch_question(
        &self,
        submission_id: &SubmissionId,
        key: &QuestionKey,
    ) -> Result<FetchQuestionResponse, BackendError>;

    async fn submit_answer(
        &self,
        submission_id: &SubmissionId,
        answer: &SubmitAnswerRequest,
    ) -> Result<(), BackendError>;

    async fn fetch_attempted_keys(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Vec<QuestionKey>, BackendError>;

    async fn pause_exam(
        &self,
        submission_id: &SubmissionId,
        time_remaining_seconds: u64,
    ) -> Result<(), BackendError>;

    async fn resume_exam(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<ResumeExamResponse, BackendError>;

    async fn complete_exam(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<CompleteExamResponse, BackendError>;
}
