use std::time::{Duration, Instant};

/// Abstraction over where frame timestamps originate from.
///
/// Timestamps are milliseconds on a monotonic timeline, the unit
/// [`crate::gradient::Gradient::animate`] expects.
pub trait TimeSource {
    /// Timestamp for the frame being delivered now.
    fn timestamp(&mut self) -> f64;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn timestamp(&mut self) -> f64 {
        duration_ms(self.origin.elapsed())
    }
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
