use validator::Validate;

use crate::schemas::entry::{SessionEntry, SessionTarget};
use crate::services::backend::ExamBackend;
use crate::session::addressing::QuestionResolver;
use crate::session::controller::{ExamSessionController, SessionSetup};
use crate::session::effects::SessionDriver;
use crate::session::errors::SessionError;
use crate::session::proctoring::{FullscreenPlatform, ProctoringGuard, ProctoringPolicy};
use crate::session::types::{NoticeLevel, SessionState};

/// Starts or resumes the submission named by `entry` and loads its first question.
/// Returns a controller that is already `InProgress`.
pub(crate) async fn open_session(
    backend: &dyn ExamBackend,
    entry: &SessionEntry,
    screen: Box<dyn FullscreenPlatform>,
    policy: ProctoringPolicy,
) -> Result<ExamSessionController, SessionError> {
    let target = entry.target()?;
    let mut attempted = None;

    let setup = match target {
        SessionTarget::Exercise { exercise_id } => {
            let started = backend.start_exam(exercise_id, &entry.user_id).await?;
            started.validate().map_err(|e| SessionError::InvalidLayout(e.to_string()))?;

            let time_remaining_seconds = started
                .time_remaining_seconds
                .or(entry.time_remaining_seconds)
                .or(started.exercise.duration_seconds)
                .ok_or_else(|| {
                    SessionError::LoadFailed("backend did not report remaining time".to_string())
                })?;
            tracing::info!(
                submission_id = %started.submission_id,
                exercise_id,
                title = %started.exercise.title,
                "Exercise test started"
            );

            SessionSetup {
                submission_id: started.submission_id,
                resolver: QuestionResolver::sequential(started.exercise.total_questions)?,
                time_remaining_seconds,
                duration_seconds: started.exercise.duration_seconds.or(entry.duration_seconds),
                policy,
            }
        }
        SessionTarget::Chapter { chapter_id } => {
            let started = backend.start_chapter_test(chapter_id, &entry.user_id).await?;
            started.validate().map_err(|e| SessionError::InvalidLayout(e.to_string()))?;
            tracing::info!(
                submission_id = %started.submission_id,
                chapter_id,
                total_questions = started.question_ids.len(),
                "Chapter test started"
            );

            SessionSetup {
                submission_id: started.submission_id,
                resolver: QuestionResolver::listed(started.question_ids)?,
                time_remaining_seconds: started.time_remaining_seconds,
                duration_seconds: started.duration_seconds.or(entry.duration_seconds),
                policy,
            }
        }
        SessionTarget::Resume { submission_id } => {
            let resumed = backend.resume_exam(&submission_id).await?;
            let keys = backend.fetch_attempted_keys(&submission_id).await?;
            tracing::info!(
                submission_id = %submission_id,
                remaining_seconds = resumed.time_remaining_seconds,
                attempted = keys.len(),
                "Submission resumed"
            );
            attempted = Some(keys);

            SessionSetup {
                submission_id,
                resolver: QuestionResolver::from_layout(resumed.layout)?,
                time_remaining_seconds: resumed.time_remaining_seconds,
                duration_seconds: resumed.duration_seconds.or(entry.duration_seconds),
                policy,
            }
        }
    };

    let mut controller = ExamSessionController::new(setup, ProctoringGuard::new(screen));
    if let Some(keys) = attempted {
        controller.restore_attempted(keys);
    }

    let first = controller.begin()?;
    SessionDriver::new(backend).run(&mut controller, first).await;

    if controller.state() != SessionState::InProgress {
        let reason = controller
            .take_notices()
            .into_iter()
            .find(|notice| notice.level == NoticeLevel::Error)
            .map(|notice| notice.message)
            .unwrap_or_else(|| "first question did not load".to_string());
        return Err(SessionError::LoadFailed(reason));
    }

    Ok(controller)
}
