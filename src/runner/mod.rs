//! Interactive event loop for one exam session.
//!
//! Backend calls run as spawned tasks and report back over a channel, so the countdown keeps
//! ticking while any of them is outstanding. All controller mutation happens on this loop.

pub(crate) mod commands;
pub(crate) mod render;
pub(crate) mod terminal;

use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::core::config::ExamSettings;
use crate::core::shutdown;
use crate::services::backend::ExamBackend;
use crate::services::report::ExamReport;
use crate::session::controller::ExamSessionController;
use crate::session::effects::{BackendReply, Effect, SessionDriver};
use crate::session::errors::SessionError;
use crate::session::types::{SessionState, SubmissionId};
use commands::{resolve_choice, Command, HELP};
use terminal::FocusTracker;

/// How the loop ended.
#[derive(Debug)]
pub(crate) enum SessionOutcome {
    Completed(ExamReport),
    /// Left while paused; the submission can be resumed later.
    Paused(SubmissionId),
    Interrupted { paused: bool },
}

struct EventLoop {
    controller: ExamSessionController,
    backend: Arc<dyn ExamBackend>,
    replies: mpsc::UnboundedSender<BackendReply>,
    outstanding: usize,
    quitting: bool,
}

impl EventLoop {
    fn dispatch(&mut self, effect: Effect) {
        tracing::debug!(call = effect.name(), outstanding = self.outstanding, "Dispatching backend call");
        self.outstanding += 1;
        let backend = Arc::clone(&self.backend);
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let reply = effect.execute(backend.as_ref()).await;
            if replies.send(reply).is_err() {
                tracing::debug!("Session loop ended before a backend reply arrived");
            }
        });
    }

    fn dispatch_all(&mut self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.dispatch(effect);
        }
    }

    fn handle_reply(&mut self, reply: BackendReply) {
        self.outstanding = self.outstanding.saturating_sub(1);
        let redraw = matches!(
            reply,
            BackendReply::Question { .. } | BackendReply::Paused { .. } | BackendReply::Resumed { .. }
        );
        let follow_up = self.controller.apply(reply);
        self.dispatch_all(follow_up);

        // A failed pause keeps the test-taker in the exam.
        if self.quitting
            && !self.controller.is_pausing()
            && self.controller.state() == SessionState::InProgress
            && !self.controller.is_submitting()
        {
            self.quitting = false;
        }
        if redraw {
            print!("{}", render::question(&self.controller));
        }
    }

    fn handle_line(&mut self, line: &str) {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(err) => {
                println!("{err}");
                return;
            }
        };

        if let Err(err) = self.handle_command(command) {
            tracing::debug!(error = %err, "Command rejected");
            println!("{err}");
        }
    }

    fn handle_command(&mut self, command: Command) -> Result<(), SessionError> {
        let controller = &mut self.controller;
        let effect = match command {
            Command::Next => controller.go_to_next()?,
            Command::Previous => controller.go_to_previous()?,
            Command::Jump(position) => controller.jump_to(position)?,
            Command::Answer(raw) => {
                let options =
                    controller.current_question().map(|q| q.options.clone()).unwrap_or_default();
                let value = resolve_choice(&options, &raw);
                Some(controller.select_answer(controller.current_position(), value)?)
            }
            Command::Grid => {
                print!("{}", render::grid(controller));
                None
            }
            Command::Submit => {
                controller.request_submit()?;
                print!("{}", render::question(controller));
                None
            }
            Command::Confirm => Some(controller.confirm_submit()?),
            Command::Cancel => {
                controller.cancel_submit();
                None
            }
            Command::Pause => Some(controller.request_pause()?),
            Command::Resume => Some(controller.request_resume()?),
            Command::Reload => Some(controller.reload()?),
            Command::Help => {
                println!("{HELP}");
                None
            }
            Command::Quit => {
                self.quitting = true;
                match controller.state() {
                    SessionState::InProgress if !controller.is_pausing() => {
                        Some(controller.request_pause()?)
                    }
                    _ => None,
                }
            }
        };

        if let Some(effect) = effect {
            self.dispatch(effect);
        }
        Ok(())
    }

    fn flush_notices(&mut self) {
        for notice in self.controller.take_notices() {
            println!("{}", render::notice(&notice));
        }
    }

    fn finished(&self) -> bool {
        match self.controller.state() {
            SessionState::Completed => true,
            SessionState::Paused => self.quitting && self.outstanding == 0,
            SessionState::Loading | SessionState::InProgress => false,
        }
    }

    /// Persists the remaining time before the process goes away.
    async fn pause_for_exit(&mut self) -> bool {
        if self.controller.state() != SessionState::InProgress || self.controller.is_pausing() {
            return self.controller.state() == SessionState::Paused;
        }
        match self.controller.request_pause() {
            Ok(effect) => {
                SessionDriver::new(self.backend.as_ref()).run(&mut self.controller, effect).await;
                self.controller.state() == SessionState::Paused
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not pause before exit");
                false
            }
        }
    }
}

/// Reads stdin on its own thread; a blocked read must not hold up runtime shutdown.
/// Terminal focus reports are peeled off before a line reaches the command parser.
fn spawn_input_reader(focus: FocusTracker) -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = line.map(|line| focus.absorb(&line));
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub(crate) async fn run_session(
    controller: ExamSessionController,
    backend: Arc<dyn ExamBackend>,
    settings: &ExamSettings,
    focus: FocusTracker,
) -> anyhow::Result<SessionOutcome> {
    let (replies, mut reply_rx) = mpsc::unbounded_channel();
    let mut event_loop =
        EventLoop { controller, backend, replies, outstanding: 0, quitting: false };

    let mut ticks = tokio::time::interval(settings.tick_period());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticks.tick().await;
    let mut proctoring = tokio::time::interval(settings.proctoring_poll_period());
    proctoring.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = spawn_input_reader(focus);
    let mut stdin_open = true;
    let interrupt = shutdown::interrupt_signal();
    tokio::pin!(interrupt);

    event_loop.flush_notices();
    print!("{}", render::question(&event_loop.controller));
    println!("Type `help` for commands.");

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let remaining_before = event_loop.controller.time_remaining();
                if let Some(effect) = event_loop.controller.tick() {
                    event_loop.dispatch(effect);
                }
                let remaining = event_loop.controller.time_remaining();
                if remaining != remaining_before && (remaining % 60 == 0 || remaining <= 10) {
                    println!("{}", render::status_line(&event_loop.controller));
                }
            }
            _ = proctoring.tick() => {
                if let Some(effect) = event_loop.controller.poll_proctoring() {
                    event_loop.dispatch(effect);
                }
            }
            Some(reply) = reply_rx.recv() => {
                event_loop.handle_reply(reply);
            }
            line = lines.recv(), if stdin_open => {
                match line.transpose()? {
                    Some(line) => event_loop.handle_line(&line),
                    None => {
                        tracing::info!("Input closed; leaving the exam");
                        stdin_open = false;
                        event_loop.handle_line("quit");
                    }
                }
            }
            interrupt = &mut interrupt => {
                tracing::info!(signal = interrupt.as_str(), state = %event_loop.controller.state(), "Leaving exam on interrupt");
                let paused = event_loop.pause_for_exit().await;
                event_loop.flush_notices();
                return Ok(SessionOutcome::Interrupted { paused });
            }
        }

        event_loop.flush_notices();

        if event_loop.finished() {
            break;
        }
    }

    let submission_id = event_loop.controller.submission_id().clone();
    match event_loop.controller.into_report() {
        Some(report) => Ok(SessionOutcome::Completed(report)),
        None => Ok(SessionOutcome::Paused(submission_id)),
    }
}
