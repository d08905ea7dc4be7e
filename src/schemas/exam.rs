use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::session::types::{QuestionKey, QuestionPayload, SubmissionId};

#[derive(Debug, Serialize)]
pub(crate) struct StartSessionRequest<'a> {
    pub(crate) user_id: &'a str,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct ExerciseMetadata {
    #[serde(default)]
    pub(crate) title: String,
    #[serde(alias = "totalQuestions")]
    #[validate(range(min = 1, message = "total_questions must be positive"))]
    pub(crate) total_questions: u32,
    #[serde(default)]
    #[serde(alias = "durationSeconds")]
    pub(crate) duration_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct StartExamResponse {
    #[serde(alias = "submissionId")]
    pub(crate) submission_id: SubmissionId,
    #[validate(nested)]
    pub(crate) exercise: ExerciseMetadata,
    #[serde(default)]
    #[serde(alias = "timeRemainingSeconds")]
    pub(crate) time_remaining_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct StartChapterTestResponse {
    #[serde(alias = "submissionId")]
    pub(crate) submission_id: SubmissionId,
    #[serde(alias = "questionIds")]
    #[validate(length(min = 1, message = "question_ids must not be empty"))]
    pub(crate) question_ids: Vec<String>,
    #[serde(alias = "timeRemainingSeconds")]
    pub(crate) time_remaining_seconds: u64,
    #[serde(default)]
    #[serde(alias = "durationSeconds")]
    pub(crate) duration_seconds: Option<u64>,
}

/// How a resumed submission addresses its questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum SessionLayout {
    Sequential {
        #[serde(alias = "totalQuestions")]
        total_questions: u32,
    },
    Listed {
        #[serde(alias = "questionIds")]
        question_ids: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResumeExamResponse {
    #[serde(alias = "timeRemainingSeconds")]
    pub(crate) time_remaining_seconds: u64,
    pub(crate) layout: SessionLayout,
    #[serde(default)]
    #[serde(alias = "durationSeconds")]
    pub(crate) duration_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FetchQuestionRequest<'a> {
    pub(crate) question_key: &'a QuestionKey,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FetchQuestionResponse {
    pub(crate) question: QuestionPayload,
    #[serde(default)]
    #[serde(alias = "previousAnswer")]
    pub(crate) previous_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SubmitAnswerRequest {
    pub(crate) question_key: QuestionKey,
    pub(crate) value: String,
    pub(crate) dwell_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AttemptedKeysResponse {
    #[serde(default)]
    pub(crate) keys: Vec<QuestionKey>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PauseExamRequest {
    pub(crate) time_remaining_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct CompleteExamResponse {
    pub(crate) score: u32,
    #[serde(alias = "totalQuestions")]
    pub(crate) total_questions: u32,
}
