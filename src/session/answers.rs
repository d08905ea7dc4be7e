use std::collections::{HashMap, HashSet};

use tokio::time::Instant;

use crate::schemas::exam::SubmitAnswerRequest;
use crate::session::errors::SessionError;
use crate::session::types::{QuestionKey, SubmissionId};

/// One answer write, captured at selection time. Its key and position stay bound to the
/// question that was on screen, whatever is displayed when the reply lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnswerTicket {
    pub(crate) submission_id: SubmissionId,
    pub(crate) position: u32,
    pub(crate) request: SubmitAnswerRequest,
}

impl AnswerTicket {
    pub(crate) fn key(&self) -> &QuestionKey {
        &self.request.question_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AnswerOutcome {
    Saved,
    /// The selection on screen went back to `restored`.
    RolledBack { restored: Option<String> },
    /// Failed for a question no longer on screen; nothing visible changed.
    FailedOffscreen,
}

#[derive(Debug, Clone)]
struct InFlight {
    previous: Option<String>,
    value: String,
}

#[derive(Debug, Clone)]
struct Displayed {
    key: QuestionKey,
    since: Instant,
}

/// Selection, attempted set and outstanding writes for one session.
#[derive(Debug, Default)]
pub(crate) struct AnswerBook {
    attempted: HashSet<QuestionKey>,
    selected: Option<String>,
    displayed: Option<Displayed>,
    in_flight: HashMap<QuestionKey, InFlight>,
}

impl AnswerBook {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restore_attempted(&mut self, keys: impl IntoIterator<Item = QuestionKey>) {
        self.attempted.extend(keys);
    }

    /// Clears the on-screen selection; the next question has not arrived yet.
    pub(crate) fn leave_question(&mut self) {
        self.selected = None;
        self.displayed = None;
    }

    /// Starts the dwell clock for `key` and shows the answer it already has, preferring
    /// a write still in flight over what the backend last stored.
    pub(crate) fn show_question(&mut self, key: QuestionKey, saved_answer: Option<String>) {
        self.selected = match self.in_flight.get(&key) {
            Some(pending) => Some(pending.value.clone()),
            None => saved_answer,
        };
        self.displayed = Some(Displayed { key, since: Instant::now() });
    }

    pub(crate) fn begin(
        &mut self,
        submission_id: &SubmissionId,
        position: u32,
        key: QuestionKey,
        value: String,
    ) -> Result<AnswerTicket, SessionError> {
        let since = match &self.displayed {
            Some(displayed) if displayed.key == key => displayed.since,
            _ => return Err(SessionError::NotDisplayed { position }),
        };
        if self.in_flight.contains_key(&key) {
            return Err(SessionError::AnswerInFlight(key));
        }

        let dwell_seconds = since.elapsed().as_secs();
        let previous = self.selected.replace(value.clone());
        self.in_flight.insert(key.clone(), InFlight { previous, value: value.clone() });

        Ok(AnswerTicket {
            submission_id: submission_id.clone(),
            position,
            request: SubmitAnswerRequest { question_key: key, value, dwell_seconds },
        })
    }

    pub(crate) fn finish(&mut self, ticket: &AnswerTicket, saved: bool) -> AnswerOutcome {
        let key = ticket.key();
        let pending = self.in_flight.remove(key);
        let on_screen = self.displayed.as_ref().is_some_and(|displayed| &displayed.key == key);

        if saved {
            self.attempted.insert(key.clone());
            if on_screen {
                self.selected = Some(ticket.request.value.clone());
            }
            return AnswerOutcome::Saved;
        }

        if !on_screen {
            return AnswerOutcome::FailedOffscreen;
        }
        let restored = pending.and_then(|pending| pending.previous);
        self.selected = restored.clone();
        AnswerOutcome::RolledBack { restored }
    }

    pub(crate) fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub(crate) fn is_attempted(&self, key: &QuestionKey) -> bool {
        self.attempted.contains(key)
    }

    pub(crate) fn attempted_count(&self) -> usize {
        self.attempted.len()
    }

    pub(crate) fn is_in_flight(&self, key: &QuestionKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub(crate) fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }
}
