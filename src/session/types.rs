use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend-assigned identifier of one exam attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct SubmissionId(String);

impl SubmissionId {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ExamMode {
    ExerciseTest,
    ChapterTest,
}

impl ExamMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::ExerciseTest => "exercise_test",
            Self::ChapterTest => "chapter_test",
        }
    }
}

/// Lookup key for a question and its answer status. Sequential keys travel as JSON
/// numbers, identifier keys as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum QuestionKey {
    Number(u32),
    Id(String),
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Id(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Loading,
    InProgress,
    Paused,
    Completed,
}

impl SessionState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started the final submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionTrigger {
    Manual,
    TimeExpired,
}

impl CompletionTrigger {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::TimeExpired => "time_expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GridLayout {
    pub(crate) rows: Vec<String>,
    pub(crate) columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuestionPayload {
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default)]
    pub(crate) grid: Option<GridLayout>,
    #[serde(default)]
    #[serde(alias = "imageUrl")]
    pub(crate) image_url: Option<String>,
    #[serde(default)]
    #[serde(alias = "subQuestion")]
    pub(crate) sub_question: Option<String>,
}

/// User-facing message raised by the session; drained by whoever renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notice {
    pub(crate) level: NoticeLevel,
    pub(crate) message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl Notice {
    pub(crate) fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_key_serializes_by_shape() {
        assert_eq!(serde_json::to_value(QuestionKey::Number(12)).unwrap(), serde_json::json!(12));
        assert_eq!(
            serde_json::to_value(QuestionKey::Id("q7".to_string())).unwrap(),
            serde_json::json!("q7")
        );
        let parsed: Vec<QuestionKey> = serde_json::from_str(r#"[3, "a"]"#).unwrap();
        assert_eq!(parsed, vec![QuestionKey::Number(3), QuestionKey::Id("a".to_string())]);
    }

    #[test]
    fn question_payload_accepts_camel_case_aliases() {
        let payload: QuestionPayload = serde_json::from_value(serde_json::json!({
            "text": "Pick the odd one out",
            "options": ["(A)", "(B)"],
            "imageUrl": "https://cdn.example.test/q1.png",
            "subQuestion": "Why?"
        }))
        .unwrap();
        assert_eq!(payload.image_url.as_deref(), Some("https://cdn.example.test/q1.png"));
        assert_eq!(payload.sub_question.as_deref(), Some("Why?"));
        assert!(payload.grid.is_none());
    }
}
