use crate::session::addressing::QuestionResolver;
use crate::session::types::QuestionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Move {
    Next,
    Previous,
    Jump(i64),
}

impl Move {
    /// Target position after clamping; never errors.
    pub(crate) fn target(self, resolver: &QuestionResolver, current: u32) -> u32 {
        let current = i64::from(current);
        let requested = match self {
            Self::Next => current + 1,
            Self::Previous => current - 1,
            Self::Jump(position) => position,
        };
        resolver.clamp(requested)
    }
}

pub(crate) fn progress_percent(position: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (f64::from(position) / f64::from(total) * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellState {
    Current,
    Answered,
    Unvisited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GridCell {
    pub(crate) position: u32,
    pub(crate) state: CellState,
}

/// One cell per position; `Current` wins over `Answered`.
pub(crate) fn overview_grid(
    resolver: &QuestionResolver,
    current: u32,
    is_attempted: impl Fn(&QuestionKey) -> bool,
) -> Vec<GridCell> {
    resolver
        .positions()
        .map(|(position, key)| {
            let state = if position == current {
                CellState::Current
            } else if is_attempted(&key) {
                CellState::Answered
            } else {
                CellState::Unvisited
            };
            GridCell { position, state }
        })
        .collect()
}
