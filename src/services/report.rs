use time::OffsetDateTime;

use crate::core::time::format_offset;
use crate::schemas::exam::CompleteExamResponse;
use crate::session::types::{CompletionTrigger, ExamMode, SubmissionId};

/// Final outcome handed to the read-only report view once a session completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExamReport {
    pub(crate) submission_id: SubmissionId,
    pub(crate) mode: ExamMode,
    pub(crate) score: u32,
    pub(crate) total_questions: u32,
    pub(crate) attempted: usize,
    pub(crate) trigger: CompletionTrigger,
    pub(crate) completed_at: OffsetDateTime,
}

impl ExamReport {
    pub(crate) fn from_completion(
        submission_id: SubmissionId,
        mode: ExamMode,
        response: CompleteExamResponse,
        attempted: usize,
        trigger: CompletionTrigger,
    ) -> Self {
        Self {
            submission_id,
            mode,
            score: response.score,
            total_questions: response.total_questions,
            attempted,
            trigger,
            completed_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn percentage(&self) -> u8 {
        if self.total_questions == 0 {
            return 0;
        }
        let ratio = f64::from(self.score) / f64::from(self.total_questions) * 100.0;
        ratio.round().clamp(0.0, 100.0) as u8
    }

    pub(crate) fn summary_lines(&self) -> Vec<String> {
        let ending = match self.trigger {
            CompletionTrigger::Manual => "submitted",
            CompletionTrigger::TimeExpired => "submitted automatically when time ran out",
        };
        vec![
            format!("Exam {ending}."),
            format!(
                "Score: {}/{} ({}%)",
                self.score,
                self.total_questions,
                self.percentage()
            ),
            format!("Answered: {} of {}", self.attempted, self.total_questions),
            format!("Submission: {} ({})", self.submission_id, self.mode.as_str()),
            format!("Completed at: {}", format_offset(self.completed_at)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(score: u32, total: u32, trigger: CompletionTrigger) -> ExamReport {
        ExamReport::from_completion(
            SubmissionId::new("sub-report"),
            ExamMode::ExerciseTest,
            CompleteExamResponse { score, total_questions: total },
            2,
            trigger,
        )
    }

    #[test]
    fn percentage_rounds_score_ratio() {
        assert_eq!(report(1, 3, CompletionTrigger::Manual).percentage(), 33);
        assert_eq!(report(2, 3, CompletionTrigger::Manual).percentage(), 67);
        assert_eq!(report(0, 0, CompletionTrigger::Manual).percentage(), 0);
    }

    #[test]
    fn summary_mentions_auto_submission() {
        let lines = report(1, 3, CompletionTrigger::TimeExpired).summary_lines();
        assert!(lines[0].contains("time ran out"));
        assert_eq!(lines[1], "Score: 1/3 (33%)");
        assert_eq!(lines[2], "Answered: 2 of 3");
    }
}
