use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::{
    cursor::MoveTo,
    event::{DisableFocusChange, EnableFocusChange},
    execute,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::session::proctoring::{FullscreenPlatform, ProctoringError};

const FOCUS_GAINED: char = 'I';
const FOCUS_LOST: char = 'O';

/// Focus state reported by the terminal (`CSI I` / `CSI O`), shared with the input reader.
#[derive(Debug, Clone)]
pub(crate) struct FocusTracker(Arc<AtomicBool>);

impl Default for FocusTracker {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl FocusTracker {
    pub(crate) fn is_focused(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, focused: bool) {
        self.0.store(focused, Ordering::Release);
    }

    /// Removes focus reports from a line of input and records the last one seen.
    pub(crate) fn absorb(&self, line: &str) -> String {
        let mut cleaned = String::with_capacity(line.len());
        let mut rest = line;
        let mut last = None;

        while let Some(index) = rest.find("\x1b[") {
            cleaned.push_str(&rest[..index]);
            let tail = &rest[index + 2..];
            match tail.chars().next() {
                Some(FOCUS_GAINED) => last = Some(true),
                Some(FOCUS_LOST) => last = Some(false),
                _ => {
                    cleaned.push_str("\x1b[");
                    rest = tail;
                    continue;
                }
            }
            rest = &tail[1..];
        }
        cleaned.push_str(rest);

        if let Some(focused) = last {
            tracing::debug!(focused, "Terminal focus changed");
            self.set(focused);
        }
        cleaned
    }
}

/// The terminal's alternate screen stands in for full-screen presentation. Losing window
/// focus counts as leaving it.
#[derive(Debug, Default)]
pub(crate) struct TerminalScreen {
    active: bool,
    focus: FocusTracker,
}

impl TerminalScreen {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn focus_tracker(&self) -> FocusTracker {
        self.focus.clone()
    }
}

impl FullscreenPlatform for TerminalScreen {
    fn request_fullscreen(&mut self) -> Result<(), ProctoringError> {
        // Focus cannot be taken back from here; the test-taker has to return.
        if self.active {
            return Ok(());
        }
        let mut stdout = io::stdout();
        if !stdout.is_terminal() {
            return Err(ProctoringError::Unsupported);
        }
        if std::env::var("TERM").is_ok_and(|term| term == "dumb") {
            return Err(ProctoringError::Denied("TERM=dumb has no alternate screen".to_string()));
        }
        execute!(stdout, EnterAlternateScreen, EnableFocusChange, MoveTo(0, 0), Clear(ClearType::All))?;
        self.focus.set(true);
        self.active = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<(), ProctoringError> {
        if !self.active {
            return Ok(());
        }
        let mut stdout = io::stdout();
        execute!(stdout, DisableFocusChange, LeaveAlternateScreen)?;
        stdout.flush()?;
        self.active = false;
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.active && self.focus.is_focused()
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        if self.active {
            let _ = execute!(io::stdout(), DisableFocusChange, LeaveAlternateScreen);
        }
    }
}
