//! Lifecycle of one exam attempt: `Loading → InProgress ⇄ Paused → Completed`.
//!
//! The controller never awaits. Operations that need the backend hand back an [`Effect`];
//! the caller runs it and feeds the [`BackendReply`] to [`ExamSessionController::apply`].
//! Outstanding calls are tracked here, which is what keeps answer writes for one question
//! ordered and keeps completion from overlapping any write.

use crate::core::metrics;
use crate::schemas::exam::FetchQuestionResponse;
use crate::services::backend::BackendError;
use crate::services::report::ExamReport;
use crate::session::addressing::QuestionResolver;
use crate::session::answers::{AnswerBook, AnswerOutcome};
use crate::session::countdown::{Countdown, Tick};
use crate::session::effects::{BackendReply, Effect};
use crate::session::errors::SessionError;
use crate::session::navigation::{overview_grid, progress_percent, GridCell, Move};
use crate::session::proctoring::{GuardChange, ProctoringGuard, ProctoringPolicy};
use crate::session::types::{
    CompletionTrigger, ExamMode, Notice, QuestionKey, QuestionPayload, SessionState, SubmissionId,
};

/// Everything the backend told us when the attempt was opened.
#[derive(Debug, Clone)]
pub(crate) struct SessionSetup {
    pub(crate) submission_id: SubmissionId,
    pub(crate) resolver: QuestionResolver,
    pub(crate) time_remaining_seconds: u64,
    pub(crate) duration_seconds: Option<u64>,
    pub(crate) policy: ProctoringPolicy,
}

#[derive(Debug, Default)]
struct PendingCalls {
    pausing: bool,
    resuming: bool,
    completing: Option<CompletionTrigger>,
    completion_deferred: bool,
    confirm_requested: bool,
}

#[derive(Debug)]
pub(crate) struct ExamSessionController {
    submission_id: SubmissionId,
    resolver: QuestionResolver,
    duration_seconds: Option<u64>,
    policy: ProctoringPolicy,
    state: SessionState,
    position: u32,
    question: Option<QuestionPayload>,
    countdown: Countdown,
    guard: ProctoringGuard,
    answers: AnswerBook,
    pending: PendingCalls,
    notices: Vec<Notice>,
    report: Option<ExamReport>,
}

impl ExamSessionController {
    pub(crate) fn new(setup: SessionSetup, guard: ProctoringGuard) -> Self {
        Self {
            submission_id: setup.submission_id,
            resolver: setup.resolver,
            duration_seconds: setup.duration_seconds,
            policy: setup.policy,
            state: SessionState::Loading,
            position: 1,
            question: None,
            countdown: Countdown::idle(setup.time_remaining_seconds),
            guard,
            answers: AnswerBook::new(),
            pending: PendingCalls::default(),
            notices: Vec::new(),
            report: None,
        }
    }

    /// Rebuilds the attempted set of a resumed submission and moves the cursor to the
    /// furthest attempted question. Keys that do not belong to this session are ignored.
    pub(crate) fn restore_attempted(&mut self, keys: Vec<QuestionKey>) {
        if self.state != SessionState::Loading {
            tracing::warn!(state = %self.state, "Ignoring attempted keys outside of loading");
            return;
        }

        let mut furthest = None;
        let mut known = Vec::with_capacity(keys.len());
        for key in keys {
            match self.resolver.position_of(&key) {
                Some(position) => {
                    furthest = furthest.max(Some(position));
                    known.push(key);
                }
                None => {
                    tracing::warn!(submission_id = %self.submission_id, question_key = %key, "Backend reported an unknown attempted key");
                }
            }
        }

        tracing::info!(
            submission_id = %self.submission_id,
            attempted = known.len(),
            resume_position = furthest.unwrap_or(1),
            "Restored attempted questions"
        );
        self.answers.restore_attempted(known);
        if let Some(position) = furthest {
            self.position = position;
        }
    }

    /// Requests the first question; the session goes live once it arrives.
    pub(crate) fn begin(&mut self) -> Result<Effect, SessionError> {
        if self.state != SessionState::Loading {
            return Err(SessionError::invalid_state("begin", self.state));
        }
        Ok(self.fetch_current())
    }

    /// Fetches the question on screen again, e.g. after a failed load.
    pub(crate) fn reload(&mut self) -> Result<Effect, SessionError> {
        match self.state {
            SessionState::Loading | SessionState::InProgress => {
                self.question = None;
                self.answers.leave_question();
                Ok(self.fetch_current())
            }
            state => Err(SessionError::invalid_state("reload", state)),
        }
    }

    pub(crate) fn go_to_next(&mut self) -> Result<Option<Effect>, SessionError> {
        self.navigate(Move::Next)
    }

    pub(crate) fn go_to_previous(&mut self) -> Result<Option<Effect>, SessionError> {
        self.navigate(Move::Previous)
    }

    pub(crate) fn jump_to(&mut self, position: i64) -> Result<Option<Effect>, SessionError> {
        self.navigate(Move::Jump(position))
    }

    pub(crate) fn navigate(&mut self, step: Move) -> Result<Option<Effect>, SessionError> {
        self.require_in_progress("navigate")?;

        let target = step.target(&self.resolver, self.position);
        self.pending.confirm_requested = false;
        if target == self.position && self.question.is_some() {
            return Ok(None);
        }

        self.position = target;
        self.question = None;
        self.answers.leave_question();
        Ok(Some(self.fetch_current()))
    }

    /// Records a selection for the question on screen and asks for it to be saved. The
    /// selection shows immediately and is rolled back if the save fails.
    pub(crate) fn select_answer(
        &mut self,
        position: u32,
        value: impl Into<String>,
    ) -> Result<Effect, SessionError> {
        self.require_in_progress("answer")?;
        // Expired with writes outstanding counts as submitting.
        if self.is_submitting() {
            return Err(SessionError::CompletionInFlight);
        }
        if self.pending.pausing {
            return Err(SessionError::LifecycleInFlight);
        }
        if position != self.position {
            return Err(SessionError::NotDisplayed { position });
        }
        if self.question.is_none() {
            return Err(SessionError::QuestionNotLoaded(position));
        }

        let key = self.resolver.resolve_key(position);
        let ticket = self.answers.begin(&self.submission_id, position, key, value.into())?;
        tracing::debug!(
            submission_id = %self.submission_id,
            question_key = %ticket.key(),
            position,
            dwell_seconds = ticket.request.dwell_seconds,
            "Saving answer"
        );
        Ok(Effect::SubmitAnswer(ticket))
    }

    /// One-second heartbeat. Inert outside `InProgress`; at zero it starts the automatic
    /// submission, once.
    pub(crate) fn tick(&mut self) -> Option<Effect> {
        if self.state != SessionState::InProgress {
            return None;
        }

        match self.countdown.tick() {
            Tick::Expired => {
                tracing::info!(submission_id = %self.submission_id, "Time is up; submitting");
                self.notices.push(Notice::warning("Time is up. Your exam is being submitted."));
                self.start_completion(CompletionTrigger::TimeExpired)
            }
            Tick::Running { remaining } => {
                if remaining % 60 == 0 {
                    tracing::debug!(submission_id = %self.submission_id, remaining_seconds = remaining, "Countdown");
                }
                None
            }
            Tick::Inert => None,
        }
    }

    /// First step of a manual submission; the caller shows a confirmation prompt.
    pub(crate) fn request_submit(&mut self) -> Result<(), SessionError> {
        self.require_in_progress("submit")?;
        if self.pending.completing.is_some() {
            return Err(SessionError::CompletionInFlight);
        }
        self.pending.confirm_requested = true;
        Ok(())
    }

    pub(crate) fn cancel_submit(&mut self) {
        self.pending.confirm_requested = false;
    }

    pub(crate) fn confirm_submit(&mut self) -> Result<Effect, SessionError> {
        self.require_in_progress("submit")?;
        if self.pending.completing.is_some() {
            return Err(SessionError::CompletionInFlight);
        }
        if !self.pending.confirm_requested {
            return Err(SessionError::ConfirmationRequired);
        }
        if self.pending.pausing {
            return Err(SessionError::LifecycleInFlight);
        }
        if self.answers.has_in_flight() {
            return Err(SessionError::AnswersPending);
        }

        self.start_completion(CompletionTrigger::Manual).ok_or(SessionError::CompletionInFlight)
    }

    /// Stops the clock and reports the remaining time; the view is left once the backend
    /// acknowledges.
    pub(crate) fn request_pause(&mut self) -> Result<Effect, SessionError> {
        self.require_in_progress("pause")?;
        if self.pending.completing.is_some() || self.pending.completion_deferred {
            return Err(SessionError::CompletionInFlight);
        }
        if self.pending.pausing {
            return Err(SessionError::LifecycleInFlight);
        }

        let time_remaining_seconds = self.countdown.stop();
        self.pending.pausing = true;
        self.pending.confirm_requested = false;
        tracing::info!(submission_id = %self.submission_id, remaining_seconds = time_remaining_seconds, "Pausing exam");
        Ok(Effect::Pause { submission_id: self.submission_id.clone(), time_remaining_seconds })
    }

    pub(crate) fn request_resume(&mut self) -> Result<Effect, SessionError> {
        if self.state != SessionState::Paused {
            return Err(SessionError::invalid_state("resume", self.state));
        }
        if self.pending.resuming {
            return Err(SessionError::LifecycleInFlight);
        }

        self.pending.resuming = true;
        tracing::info!(submission_id = %self.submission_id, "Resuming exam");
        Ok(Effect::Resume { submission_id: self.submission_id.clone() })
    }

    /// Checks the real full-screen status and applies the exit policy. Returns the pause
    /// request when the policy asks for one.
    pub(crate) fn poll_proctoring(&mut self) -> Option<Effect> {
        let change = self.guard.refresh()?;
        if change != GuardChange::ExitedExternally {
            return None;
        }
        if self.state != SessionState::InProgress || self.pending.pausing {
            return None;
        }

        ::metrics::counter!(metrics::FULLSCREEN_EXITS).increment(1);
        tracing::warn!(
            submission_id = %self.submission_id,
            policy = self.policy.as_str(),
            "Full-screen was left during the exam"
        );

        match self.policy {
            ProctoringPolicy::Observe => {
                self.notices.push(Notice::warning("You left full-screen mode."));
                None
            }
            ProctoringPolicy::Reengage => {
                if self.guard.engage() {
                    self.notices.push(Notice::warning("Full-screen mode was restored."));
                } else {
                    self.notices.push(Notice::warning("Please return to full-screen mode."));
                }
                None
            }
            ProctoringPolicy::Pause => {
                self.notices.push(Notice::warning("You left full-screen mode; pausing the exam."));
                match self.request_pause() {
                    Ok(effect) => Some(effect),
                    Err(err) => {
                        tracing::debug!(error = %err, "Exit policy could not pause");
                        None
                    }
                }
            }
        }
    }

    /// Applies one backend reply and returns any follow-up calls.
    pub(crate) fn apply(&mut self, reply: BackendReply) -> Vec<Effect> {
        match reply {
            BackendReply::Question { position, key, result } => {
                self.apply_question(position, key, result);
                Vec::new()
            }
            BackendReply::Answer { ticket, result } => {
                let saved = result.is_ok();
                let outcome = self.answers.finish(&ticket, saved);
                match result {
                    Ok(()) => {
                        ::metrics::counter!(metrics::ANSWERS_PERSISTED).increment(1);
                        tracing::debug!(
                            submission_id = %self.submission_id,
                            question_key = %ticket.key(),
                            "Answer saved"
                        );
                    }
                    Err(err) => {
                        ::metrics::counter!(metrics::ANSWER_FAILURES).increment(1);
                        tracing::warn!(
                            submission_id = %self.submission_id,
                            question_key = %ticket.key(),
                            position = ticket.position,
                            error = %err,
                            "Failed to save answer"
                        );
                        let mut message =
                            format!("Your answer to question {} was not saved ({err}).", ticket.position);
                        if let AnswerOutcome::RolledBack { restored } = &outcome {
                            message.push_str(match restored {
                                Some(_) => " Your previous answer is shown again.",
                                None => " The selection was cleared.",
                            });
                        }
                        if err.is_transient() {
                            message.push_str(" Please try again.");
                        }
                        self.notices.push(Notice::error(message));
                    }
                }

                if self.pending.completion_deferred && !self.answers.has_in_flight() {
                    self.pending.completion_deferred = false;
                    return self.start_completion(CompletionTrigger::TimeExpired).into_iter().collect();
                }
                Vec::new()
            }
            BackendReply::Paused { time_remaining_seconds, result } => {
                self.pending.pausing = false;
                match result {
                    Ok(()) => {
                        ::metrics::counter!(metrics::PAUSES).increment(1);
                        self.transition(SessionState::Paused);
                        self.question = None;
                        self.answers.leave_question();
                        self.guard.release();
                        tracing::info!(
                            submission_id = %self.submission_id,
                            remaining_seconds = time_remaining_seconds,
                            "Exam paused"
                        );
                        self.notices.push(Notice::info("Exam paused. Your remaining time is saved."));
                    }
                    Err(err) => {
                        tracing::warn!(submission_id = %self.submission_id, error = %err, "Failed to pause exam");
                        self.countdown.restart();
                        self.notices.push(Notice::error(format!("Could not pause the exam ({err}).")));
                    }
                }
                Vec::new()
            }
            BackendReply::Resumed { result } => {
                self.pending.resuming = false;
                match result {
                    Ok(resumed) => {
                        self.countdown.start(resumed.time_remaining_seconds);
                        self.transition(SessionState::InProgress);
                        self.guard.engage();
                        tracing::info!(
                            submission_id = %self.submission_id,
                            remaining_seconds = resumed.time_remaining_seconds,
                            "Exam resumed"
                        );
                        vec![self.fetch_current()]
                    }
                    Err(err) => {
                        tracing::warn!(submission_id = %self.submission_id, error = %err, "Failed to resume exam");
                        self.notices.push(Notice::error(format!("Could not resume the exam ({err}).")));
                        Vec::new()
                    }
                }
            }
            BackendReply::Completed { trigger, result } => {
                self.pending.completing = None;
                match result {
                    Ok(response) => {
                        ::metrics::counter!(metrics::COMPLETIONS, "trigger" => trigger.as_str())
                            .increment(1);
                        self.countdown.stop();
                        self.transition(SessionState::Completed);
                        self.guard.release();
                        self.question = None;
                        self.answers.leave_question();
                        tracing::info!(
                            submission_id = %self.submission_id,
                            trigger = trigger.as_str(),
                            score = response.score,
                            total_questions = response.total_questions,
                            "Exam completed"
                        );
                        self.report = Some(ExamReport::from_completion(
                            self.submission_id.clone(),
                            self.resolver.mode(),
                            response,
                            self.answers.attempted_count(),
                            trigger,
                        ));
                    }
                    Err(err) => {
                        ::metrics::counter!(metrics::COMPLETION_FAILURES).increment(1);
                        tracing::error!(
                            submission_id = %self.submission_id,
                            trigger = trigger.as_str(),
                            error = %err,
                            "Failed to complete exam"
                        );
                        self.notices.push(Notice::error(format!(
                            "Submitting the exam failed ({err}). Your answers are kept; submit again to retry."
                        )));
                    }
                }
                Vec::new()
            }
        }
    }

    pub(crate) fn submission_id(&self) -> &SubmissionId {
        &self.submission_id
    }

    pub(crate) fn mode(&self) -> ExamMode {
        self.resolver.mode()
    }

    pub(crate) fn total_questions(&self) -> u32 {
        self.resolver.total_questions()
    }

    #[cfg(test)]
    pub(crate) fn resolve_key(&self, position: u32) -> QuestionKey {
        self.resolver.resolve_key(position)
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn current_position(&self) -> u32 {
        self.position
    }

    pub(crate) fn current_question(&self) -> Option<&QuestionPayload> {
        self.question.as_ref()
    }

    pub(crate) fn selected_answer(&self) -> Option<&str> {
        self.answers.selected()
    }

    pub(crate) fn time_remaining(&self) -> u64 {
        self.countdown.remaining()
    }

    pub(crate) fn duration_seconds(&self) -> Option<u64> {
        self.duration_seconds
    }

    pub(crate) fn progress(&self) -> u8 {
        progress_percent(self.position, self.resolver.total_questions())
    }

    pub(crate) fn grid(&self) -> Vec<GridCell> {
        overview_grid(&self.resolver, self.position, |key| self.answers.is_attempted(key))
    }

    #[cfg(test)]
    pub(crate) fn is_attempted(&self, key: &QuestionKey) -> bool {
        self.answers.is_attempted(key)
    }

    pub(crate) fn attempted_count(&self) -> usize {
        self.answers.attempted_count()
    }

    pub(crate) fn is_saving(&self, position: u32) -> bool {
        self.answers.is_in_flight(&self.resolver.resolve_key(position))
    }

    #[cfg(test)]
    pub(crate) fn is_fullscreen(&self) -> bool {
        self.guard.is_engaged()
    }

    pub(crate) fn proctoring_degraded(&self) -> bool {
        self.guard.is_degraded()
    }

    pub(crate) fn awaiting_confirmation(&self) -> bool {
        self.pending.confirm_requested
    }

    pub(crate) fn is_submitting(&self) -> bool {
        self.pending.completing.is_some() || self.pending.completion_deferred
    }

    pub(crate) fn is_pausing(&self) -> bool {
        self.pending.pausing
    }

    pub(crate) fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    #[cfg(test)]
    pub(crate) fn report(&self) -> Option<&ExamReport> {
        self.report.as_ref()
    }

    /// Hands the outcome to the report view; the session itself is dropped.
    pub(crate) fn into_report(self) -> Option<ExamReport> {
        self.report
    }

    fn fetch_current(&self) -> Effect {
        Effect::FetchQuestion {
            submission_id: self.submission_id.clone(),
            position: self.position,
            key: self.resolver.resolve_key(self.position),
        }
    }

    fn apply_question(
        &mut self,
        position: u32,
        key: QuestionKey,
        result: Result<FetchQuestionResponse, BackendError>,
    ) {
        if !matches!(self.state, SessionState::Loading | SessionState::InProgress)
            || position != self.position
            || self.question.is_some()
        {
            tracing::debug!(position, question_key = %key, "Dropping stale question reply");
            return;
        }

        match result {
            Ok(fetched) => {
                self.question = Some(fetched.question);
                self.answers.show_question(key, fetched.previous_answer);
                if self.state == SessionState::Loading {
                    self.enter_in_progress();
                }
            }
            Err(err) => {
                tracing::warn!(
                    submission_id = %self.submission_id,
                    position,
                    question_key = %key,
                    error = %err,
                    "Failed to load question"
                );
                self.notices.push(Notice::error(format!(
                    "Question {position} could not be loaded ({err})."
                )));
            }
        }
    }

    fn enter_in_progress(&mut self) {
        let remaining = self.countdown.remaining();
        self.countdown.start(remaining);
        self.transition(SessionState::InProgress);
        if !self.guard.engage() {
            self.notices.push(Notice::warning("Full-screen mode is unavailable; the exam continues."));
        }
        tracing::info!(
            submission_id = %self.submission_id,
            mode = self.resolver.mode().as_str(),
            total_questions = self.resolver.total_questions(),
            remaining_seconds = remaining,
            "Exam started"
        );
    }

    fn start_completion(&mut self, trigger: CompletionTrigger) -> Option<Effect> {
        if self.pending.completing.is_some() {
            return None;
        }
        if self.answers.has_in_flight() {
            tracing::info!(
                submission_id = %self.submission_id,
                trigger = trigger.as_str(),
                "Deferring submission until answers are saved"
            );
            self.pending.completion_deferred = true;
            return None;
        }

        self.pending.completing = Some(trigger);
        self.pending.confirm_requested = false;
        tracing::info!(submission_id = %self.submission_id, trigger = trigger.as_str(), "Submitting exam");
        Some(Effect::Complete { submission_id: self.submission_id.clone(), trigger })
    }

    fn require_in_progress(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.state == SessionState::InProgress {
            Ok(())
        } else {
            Err(SessionError::invalid_state(operation, self.state))
        }
    }

    fn transition(&mut self, next: SessionState) {
        let allowed = matches!(
            (self.state, next),
            (SessionState::Loading, SessionState::InProgress)
                | (SessionState::InProgress, SessionState::Paused)
                | (SessionState::Paused, SessionState::InProgress)
                | (SessionState::Loading | SessionState::InProgress | SessionState::Paused, SessionState::Completed)
        );
        debug_assert!(allowed, "illegal transition {} -> {}", self.state, next);
        tracing::debug!(from = %self.state, to = %next, "Session state change");
        self.state = next;
    }
}
