//! Maps a 1-based position to the key the backend knows the question by.
//!
//! Exercise tests number their questions `1..=total`; chapter tests walk a list of opaque
//! identifiers fetched once when the session opens. Navigation, progress, the overview grid
//! and answer bookkeeping all go through [`QuestionResolver`] so the two schemes never leak
//! past this module.

use std::collections::HashSet;
use std::sync::Arc;

use crate::schemas::exam::SessionLayout;
use crate::session::errors::SessionError;
use crate::session::types::{ExamMode, QuestionKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QuestionResolver {
    Sequential { total: u32 },
    Listed { ids: Arc<[String]> },
}

impl QuestionResolver {
    pub(crate) fn sequential(total: u32) -> Result<Self, SessionError> {
        if total == 0 {
            return Err(SessionError::InvalidLayout("exercise has no questions".to_string()));
        }
        Ok(Self::Sequential { total })
    }

    pub(crate) fn listed(ids: Vec<String>) -> Result<Self, SessionError> {
        if ids.is_empty() {
            return Err(SessionError::InvalidLayout("chapter test has no questions".to_string()));
        }
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(SessionError::InvalidLayout("blank question identifier".to_string()));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(duplicate) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(SessionError::InvalidLayout(format!(
                "question identifier `{duplicate}` is listed twice"
            )));
        }
        if u32::try_from(ids.len()).is_err() {
            return Err(SessionError::InvalidLayout("too many questions".to_string()));
        }
        Ok(Self::Listed { ids: ids.into() })
    }

    pub(crate) fn from_layout(layout: SessionLayout) -> Result<Self, SessionError> {
        match layout {
            SessionLayout::Sequential { total_questions } => Self::sequential(total_questions),
            SessionLayout::Listed { question_ids } => Self::listed(question_ids),
        }
    }

    pub(crate) fn mode(&self) -> ExamMode {
        match self {
            Self::Sequential { .. } => ExamMode::ExerciseTest,
            Self::Listed { .. } => ExamMode::ChapterTest,
        }
    }

    pub(crate) fn total_questions(&self) -> u32 {
        match self {
            Self::Sequential { total } => *total,
            // Length is bounded by `listed`.
            Self::Listed { ids } => ids.len() as u32,
        }
    }

    /// Clamps any requested position into `[1, total_questions]`.
    pub(crate) fn clamp(&self, position: i64) -> u32 {
        let total = i64::from(self.total_questions());
        position.clamp(1, total) as u32
    }

    /// Key for `position`, clamped first so every position resolves.
    pub(crate) fn resolve_key(&self, position: u32) -> QuestionKey {
        let position = self.clamp(i64::from(position));
        match self {
            Self::Sequential { .. } => QuestionKey::Number(position),
            Self::Listed { ids } => QuestionKey::Id(ids[position as usize - 1].clone()),
        }
    }

    /// Inverse of [`resolve_key`](Self::resolve_key); `None` for keys outside this session.
    pub(crate) fn position_of(&self, key: &QuestionKey) -> Option<u32> {
        match (self, key) {
            (Self::Sequential { total }, QuestionKey::Number(number)) => {
                (1..=*total).contains(number).then_some(*number)
            }
            (Self::Listed { ids }, QuestionKey::Id(id)) => {
                ids.iter().position(|candidate| candidate == id).map(|index| index as u32 + 1)
            }
            _ => None,
        }
    }

    pub(crate) fn positions(&self) -> impl Iterator<Item = (u32, QuestionKey)> + '_ {
        (1..=self.total_questions()).map(|position| (position, self.resolve_key(position)))
    }
}
