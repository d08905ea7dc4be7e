use std::collections::VecDeque;

use crate::schemas::exam::{CompleteExamResponse, FetchQuestionResponse, ResumeExamResponse};
use crate::services::backend::{BackendError, ExamBackend};
use crate::session::answers::AnswerTicket;
use crate::session::controller::ExamSessionController;
use crate::session::types::{CompletionTrigger, QuestionKey, SubmissionId};

/// A backend call the controller wants made. Carries everything the reply needs to be
/// applied to the right question, so replies can arrive in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    FetchQuestion { submission_id: SubmissionId, position: u32, key: QuestionKey },
    SubmitAnswer(AnswerTicket),
    Pause { submission_id: SubmissionId, time_remaining_seconds: u64 },
    Resume { submission_id: SubmissionId },
    Complete { submission_id: SubmissionId, trigger: CompletionTrigger },
}

#[derive(Debug)]
pub(crate) enum BackendReply {
    Question {
        position: u32,
        key: QuestionKey,
        result: Result<FetchQuestionResponse, BackendError>,
    },
    Answer {
        ticket: AnswerTicket,
        result: Result<(), BackendError>,
    },
    Paused {
        time_remaining_seconds: u64,
        result: Result<(), BackendError>,
    },
    Resumed {
        result: Result<ResumeExamResponse, BackendError>,
    },
    Completed {
        trigger: CompletionTrigger,
        result: Result<CompleteExamResponse, BackendError>,
    },
}

impl Effect {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::FetchQuestion { .. } => "fetch_question",
            Self::SubmitAnswer(_) => "submit_answer",
            Self::Pause { .. } => "pause",
            Self::Resume { .. } => "resume",
            Self::Complete { .. } => "complete",
        }
    }

    pub(crate) async fn execute(self, backend: &dyn ExamBackend) -> BackendReply {
        match self {
            Self::FetchQuestion { submission_id, position, key } => {
                let result = backend.fetch_question(&submission_id, &key).await;
                BackendReply::Question { position, key, result }
            }
            Self::SubmitAnswer(ticket) => {
                let result = backend.submit_answer(&ticket.submission_id, &ticket.request).await;
                BackendReply::Answer { ticket, result }
            }
            Self::Pause { submission_id, time_remaining_seconds } => {
                let result = backend.pause_exam(&submission_id, time_remaining_seconds).await;
                BackendReply::Paused { time_remaining_seconds, result }
            }
            Self::Resume { submission_id } => {
                let result = backend.resume_exam(&submission_id).await;
                BackendReply::Resumed { result }
            }
            Self::Complete { submission_id, trigger } => {
                let result = backend.complete_exam(&submission_id).await;
                BackendReply::Completed { trigger, result }
            }
        }
    }
}

/// Runs effects one at a time and applies each reply before the next call goes out.
/// Used where nothing else runs concurrently, e.g. opening a session or pausing on exit.
pub(crate) struct SessionDriver<'a> {
    backend: &'a dyn ExamBackend,
}

impl<'a> SessionDriver<'a> {
    pub(crate) fn new(backend: &'a dyn ExamBackend) -> Self {
        Self { backend }
    }

    pub(crate) async fn run(&self, controller: &mut ExamSessionController, effect: Effect) {
        let mut queue = VecDeque::from([effect]);
        while let Some(effect) = queue.pop_front() {
            let reply = effect.execute(self.backend).await;
            queue.extend(controller.apply(reply));
        }
    }
}
