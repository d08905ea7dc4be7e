use validator::Validate;

use crate::core::config::{env_optional, parse_u64, ConfigError};
use crate::session::errors::SessionError;
use crate::session::types::SubmissionId;

/// Parameters the exam is mounted with. Read once; never re-derived mid-session.
#[derive(Debug, Clone, Default, Validate)]
pub(crate) struct SessionEntry {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub(crate) user_id: String,
    pub(crate) submission_id: Option<String>,
    pub(crate) exercise_id: Option<String>,
    pub(crate) chapter_id: Option<String>,
    pub(crate) time_remaining_seconds: Option<u64>,
    pub(crate) duration_seconds: Option<u64>,
}

/// Which backend call opens the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionTarget<'a> {
    Exercise { exercise_id: &'a str },
    Chapter { chapter_id: &'a str },
    Resume { submission_id: SubmissionId },
}

impl SessionEntry {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        let time_remaining_seconds = env_optional("EXAM_TIME_REMAINING_SECONDS")
            .map(|value| parse_u64("EXAM_TIME_REMAINING_SECONDS", value))
            .transpose()?;
        let duration_seconds = env_optional("EXAM_DURATION_SECONDS")
            .map(|value| parse_u64("EXAM_DURATION_SECONDS", value))
            .transpose()?;

        Ok(Self {
            user_id: env_optional("EXAM_USER_ID").unwrap_or_default(),
            submission_id: env_optional("EXAM_SUBMISSION_ID"),
            exercise_id: env_optional("EXAM_EXERCISE_ID"),
            chapter_id: env_optional("EXAM_CHAPTER_ID"),
            time_remaining_seconds,
            duration_seconds,
        })
    }

    /// A submission id resumes; otherwise exactly one of exercise or chapter must be set.
    pub(crate) fn target(&self) -> Result<SessionTarget<'_>, SessionError> {
        self.validate().map_err(|e| SessionError::InvalidEntry(e.to_string()))?;

        match (&self.submission_id, &self.exercise_id, &self.chapter_id) {
            (Some(submission_id), _, _) => {
                Ok(SessionTarget::Resume { submission_id: SubmissionId::new(submission_id.clone()) })
            }
            (None, Some(exercise_id), None) => Ok(SessionTarget::Exercise { exercise_id }),
            (None, None, Some(chapter_id)) => Ok(SessionTarget::Chapter { chapter_id }),
            (None, Some(_), Some(_)) => Err(SessionError::InvalidEntry(
                "set either EXAM_EXERCISE_ID or EXAM_CHAPTER_ID, not both".to_string(),
            )),
            (None, None, None) => Err(SessionError::InvalidEntry(
                "one of EXAM_SUBMISSION_ID, EXAM_EXERCISE_ID or EXAM_CHAPTER_ID is required"
                    .to_string(),
            )),
        }
    }
}
