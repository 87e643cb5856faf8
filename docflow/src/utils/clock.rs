//! Injectable time source.

use async_trait::async_trait;
use chrono::Local;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use super::timestamps::Timestamp;

/// Source of monotonic time, sleeping and wall-clock timestamps.
#[async_trait]
pub trait Clock: Send + Sync + Debug {
    /// Monotonic time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);

    /// Current wall-clock time, used for marker timestamps.
    fn wall_clock(&self) -> Timestamp;
}

/// The real clock: `Instant` for elapsed time, tokio for sleeping.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Creates a clock whose elapsed time starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn wall_clock(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when slept on or advanced explicitly.
#[derive(Debug)]
pub struct ManualClock {
    elapsed: Mutex<Duration>,
    origin: Timestamp,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Creates a manual clock anchored at the given wall-clock time.
    #[must_use]
    pub fn new(origin: Timestamp) -> Self {
        Self {
            elapsed: Mutex::new(Duration::ZERO),
            origin,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Returns every sleep requested so far.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        *self.elapsed.lock() += duration;
    }

    fn wall_clock(&self) -> Timestamp {
        let elapsed = chrono::Duration::from_std(*self.elapsed.lock()).unwrap_or_else(|_| chrono::Duration::zero());
        self.origin + elapsed
    }
}
