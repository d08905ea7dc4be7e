//! Local cache of the backend's remaining-time value.
//!
//! The backend owns the authoritative number. This countdown is seeded from it when the
//! session starts or resumes, decremented once per tick while running, and handed back on
//! pause. A fresh value replaces it on every resume.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Not running; nothing changed.
    Inert,
    Running { remaining: u64 },
    /// Reached zero on this tick. Reported once per seeded value.
    Expired,
}

#[derive(Debug, Clone)]
pub(crate) struct Countdown {
    remaining: u64,
    running: bool,
    expiry_reported: bool,
}

impl Countdown {
    pub(crate) fn idle(seconds: u64) -> Self {
        Self { remaining: seconds, running: false, expiry_reported: false }
    }

    pub(crate) fn start(&mut self, initial_seconds: u64) {
        self.reseed(initial_seconds);
        self.running = true;
    }

    /// Resumes ticking from the current value without reseeding.
    pub(crate) fn restart(&mut self) {
        self.running = true;
    }

    pub(crate) fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Inert;
        }

        if self.remaining == 0 {
            return self.report_expiry();
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            return self.report_expiry();
        }

        Tick::Running { remaining: self.remaining }
    }

    /// Stops ticking and returns the value to persist.
    pub(crate) fn stop(&mut self) -> u64 {
        self.running = false;
        self.remaining
    }

    pub(crate) fn reseed(&mut self, seconds: u64) {
        self.remaining = seconds;
        self.expiry_reported = false;
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining
    }

    fn report_expiry(&mut self) -> Tick {
        if self.expiry_reported {
            Tick::Inert
        } else {
            self.expiry_reported = true;
            Tick::Expired
        }
    }
}
