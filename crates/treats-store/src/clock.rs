use std::time::Duration;

use tokio::time::Instant;

/// Unix-seconds clock anchored to a tokio [`Instant`].
///
/// Wall-clock time is sampled once; afterwards time only moves with the
/// monotonic instant, so scheduler deadlines computed by [`Clock::deadline`]
/// and the timestamps handed to the workspace always agree. Under a paused
/// tokio runtime both advance together.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    base_secs: i64,
    base: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp())
    }

    pub fn starting_at(base_secs: i64) -> Self {
        Self {
            base_secs,
            base: Instant::now(),
        }
    }

    /// Current time in unix seconds.
    pub fn now(&self) -> i64 {
        self.base_secs + self.base.elapsed().as_secs() as i64
    }

    /// The instant at which [`Clock::now`] first reads `unix_secs`. Times in
    /// the past collapse onto the anchor.
    pub fn deadline(&self, unix_secs: i64) -> Instant {
        let offset = (unix_secs - self.base_secs).max(0) as u64;
        self.base + Duration::from_secs(offset)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
