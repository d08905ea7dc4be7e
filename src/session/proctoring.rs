use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ProctoringError {
    #[error("full-screen presentation is not supported here")]
    Unsupported,
    #[error("full-screen request was denied: {0}")]
    Denied(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Whatever actually presents the exam. `is_fullscreen` must report the real status,
/// including exits the platform performed on its own.
pub(crate) trait FullscreenPlatform: Send {
    fn request_fullscreen(&mut self) -> Result<(), ProctoringError>;
    fn exit_fullscreen(&mut self) -> Result<(), ProctoringError>;
    fn is_fullscreen(&self) -> bool;
}

/// What the session does when full-screen is left without being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ProctoringPolicy {
    #[default]
    Observe,
    Reengage,
    Pause,
}

impl ProctoringPolicy {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Observe => "observe",
            Self::Reengage => "reengage",
            Self::Pause => "pause",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardChange {
    Entered,
    /// Left full-screen while the guard wanted it on.
    ExitedExternally,
}

pub(crate) struct ProctoringGuard {
    platform: Box<dyn FullscreenPlatform>,
    wanted: bool,
    engaged: bool,
    degraded: bool,
}

impl ProctoringGuard {
    pub(crate) fn new(platform: Box<dyn FullscreenPlatform>) -> Self {
        let engaged = platform.is_fullscreen();
        Self { platform, wanted: false, engaged, degraded: false }
    }

    /// Best effort: a refusal leaves the guard degraded, never fails the caller.
    pub(crate) fn engage(&mut self) -> bool {
        self.wanted = true;
        match self.platform.request_fullscreen() {
            Ok(()) => {
                self.degraded = false;
            }
            Err(err) => {
                if !self.degraded {
                    tracing::warn!(error = %err, "Full-screen unavailable; continuing without proctoring");
                }
                self.degraded = true;
            }
        }
        self.engaged = self.platform.is_fullscreen();
        self.engaged
    }

    pub(crate) fn release(&mut self) {
        self.wanted = false;
        if self.platform.is_fullscreen() {
            if let Err(err) = self.platform.exit_fullscreen() {
                tracing::warn!(error = %err, "Failed to leave full-screen");
            }
        }
        self.engaged = self.platform.is_fullscreen();
    }

    /// Re-reads the platform status; reports a change only when it differs from the last one seen.
    pub(crate) fn refresh(&mut self) -> Option<GuardChange> {
        let actual = self.platform.is_fullscreen();
        if actual == self.engaged {
            return None;
        }
        self.engaged = actual;
        match (actual, self.wanted) {
            (true, _) => Some(GuardChange::Entered),
            (false, true) => Some(GuardChange::ExitedExternally),
            (false, false) => None,
        }
    }

    pub(crate) fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }
}

impl std::fmt::Debug for ProctoringGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProctoringGuard")
            .field("wanted", &self.wanted)
            .field("engaged", &self.engaged)
            .field("degraded", &self.degraded)
            .finish()
    }
}
