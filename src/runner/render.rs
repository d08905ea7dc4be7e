use std::fmt::Write as _;

use crate::core::time::format_countdown;
use crate::services::report::ExamReport;
use crate::session::controller::ExamSessionController;
use crate::session::navigation::CellState;
use crate::session::types::{Notice, NoticeLevel, SessionState};

const GRID_WIDTH: usize = 10;

pub(crate) fn status_line(controller: &ExamSessionController) -> String {
    let mut line = format!(
        "Question {}/{} | {}% | {} left",
        controller.current_position(),
        controller.total_questions(),
        controller.progress(),
        format_countdown(controller.time_remaining())
    );
    if let Some(total) = controller.duration_seconds() {
        let _ = write!(line, " of {}", format_countdown(total));
    }
    if controller.is_saving(controller.current_position()) {
        line.push_str(" | saving...");
    }
    if controller.is_submitting() {
        line.push_str(" | submitting...");
    }
    if controller.proctoring_degraded() {
        line.push_str(" | full-screen unavailable");
    }
    line
}

/// The question on screen with its options; selected option marked with `*`.
pub(crate) fn question(controller: &ExamSessionController) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", status_line(controller));

    match controller.state() {
        SessionState::Paused => {
            out.push_str("Exam paused. Type `resume` to continue or `quit` to leave.\n");
            return out;
        }
        SessionState::Completed => return out,
        SessionState::Loading | SessionState::InProgress => {}
    }

    let Some(question) = controller.current_question() else {
        out.push_str("Loading question...\n");
        return out;
    };

    let _ = writeln!(out, "\n{}", question.text);
    if let Some(image_url) = &question.image_url {
        let _ = writeln!(out, "[image] {image_url}");
    }
    if let Some(sub_question) = &question.sub_question {
        let _ = writeln!(out, "{sub_question}");
    }
    if let Some(grid) = &question.grid {
        let _ = writeln!(out, "      {}", grid.columns.join(" | "));
        for row in &grid.rows {
            let _ = writeln!(out, "  {row}");
        }
    }

    let selected = controller.selected_answer();
    if !question.options.is_empty() {
        out.push('\n');
    }
    for (index, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(option.as_str()) { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {}. {option}", index + 1);
    }
    if let Some(value) = selected.filter(|value| !question.options.iter().any(|o| o == value)) {
        let _ = writeln!(out, "Your answer: {value}");
    }
    if controller.awaiting_confirmation() {
        out.push_str("\nSubmit the exam now? Type `confirm` or `cancel`.\n");
    }
    out
}

/// Overview of every question: `>` current, `+` answered, `.` not yet answered.
pub(crate) fn grid(controller: &ExamSessionController) -> String {
    let cells = controller.grid();
    let mut out = String::new();
    for row in cells.chunks(GRID_WIDTH) {
        let line = row
            .iter()
            .map(|cell| {
                let mark = match cell.state {
                    CellState::Current => '>',
                    CellState::Answered => '+',
                    CellState::Unvisited => '.',
                };
                format!("{mark}{:>3}", cell.position)
            })
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&line);
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "Answered {} of {}",
        controller.attempted_count(),
        controller.total_questions()
    );
    out
}

pub(crate) fn notice(notice: &Notice) -> String {
    let prefix = match notice.level {
        NoticeLevel::Info => "i",
        NoticeLevel::Warning => "!",
        NoticeLevel::Error => "x",
    };
    format!("[{prefix}] {}", notice.message)
}

pub(crate) fn report(report: &ExamReport) -> String {
    report.summary_lines().join("\n")
}
