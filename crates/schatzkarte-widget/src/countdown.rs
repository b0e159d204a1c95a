//! Waiting-room minute countdown.

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Minutes left after this tick.
    Remaining(u32),
    /// The countdown reached zero and is now stopped.
    Elapsed,
    /// The countdown was already stopped; nothing changed.
    Stopped,
}

/// Counts down whole minutes until a meeting opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    running: bool,
}

impl Countdown {
    /// Starts a countdown. A countdown from zero is created already stopped.
    pub fn start(minutes: u32) -> Self {
        Self {
            remaining: minutes,
            running: minutes > 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Cancels the countdown; later ticks are inert.
    pub fn cancel(&mut self) {
        self.running = false;
    }

    /// Advances by one minute.
    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Stopped;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            Tick::Elapsed
        } else {
            Tick::Remaining(self.remaining)
        }
    }
}
