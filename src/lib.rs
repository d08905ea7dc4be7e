pub(crate) mod core;
pub(crate) mod runner;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod session;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;

use crate::core::{config::Settings, telemetry};
use crate::runner::{render, terminal::TerminalScreen, SessionOutcome};
use crate::schemas::entry::SessionEntry;
use crate::services::backend::ExamBackend;
use crate::services::http_backend::HttpExamBackend;
use crate::session::bootstrap::open_session;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let entry = SessionEntry::from_env().context("Invalid session entry parameters")?;
    let backend: Arc<dyn ExamBackend> = Arc::new(HttpExamBackend::from_settings(&settings)?);

    tracing::info!(
        base_url = settings.api().base_url.as_str(),
        environment = settings.runtime().environment.as_str(),
        exit_policy = settings.exam().exit_policy.as_str(),
        "Opening exam session"
    );

    let screen = TerminalScreen::new();
    let focus = screen.focus_tracker();
    let controller = open_session(
        backend.as_ref(),
        &entry,
        Box::new(screen),
        settings.exam().exit_policy,
    )
    .await
    .context("Failed to open exam session")?;
    tracing::info!(
        submission_id = %controller.submission_id(),
        mode = controller.mode().as_str(),
        total_questions = controller.total_questions(),
        "Exam session ready"
    );

    let outcome = runner::run_session(controller, backend, settings.exam(), focus).await?;

    match outcome {
        SessionOutcome::Completed(report) => {
            tracing::info!(
                submission_id = %report.submission_id,
                score = report.score,
                total_questions = report.total_questions,
                "Exam session finished"
            );
            println!("{}", render::report(&report));
        }
        SessionOutcome::Paused(submission_id) => {
            tracing::info!(submission_id = %submission_id, "Exam session paused");
            println!("Exam paused. Resume later with EXAM_SUBMISSION_ID={submission_id}.");
        }
        SessionOutcome::Interrupted { paused } => {
            tracing::warn!(paused, "Exam session interrupted");
            if !paused {
                println!("The exam was interrupted before its remaining time could be saved.");
            }
        }
    }

    if let Some(snapshot) = core::metrics::render() {
        tracing::debug!(metrics = %snapshot, "Session metrics");
    }

    Ok(())
}
