use std::time::Duration;

pub const FRAMES_PER_SECOND: u32 = 60;

/// One simulation frame at 60 frames per second, rounded to the nanosecond.
pub const FRAME: Duration = Duration::from_nanos(16_666_667);

/// Duration of `n` simulation frames.
pub const fn frames(n: u32) -> Duration {
    Duration::from_nanos(16_666_667 * n as u64)
}

/// A stopwatch driven by frame deltas rather than the wall clock, so two
/// peers fed the same deltas agree on how much time has passed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    elapsed: Duration,
    running: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started() -> Self {
        Self { elapsed: Duration::ZERO, running: true }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stops the timer and clears the elapsed time.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = false;
    }

    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = true;
    }

    pub fn update(&mut self, elapsed: Duration) {
        if self.running {
            self.elapsed += elapsed;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
