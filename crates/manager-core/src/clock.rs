use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of time for everything that waits on the manager.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant::now` and `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

pub static SYSTEM_CLOCK: SystemClock = SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// A clock that only moves when slept on or advanced by hand.
/// Shareable between threads; every sleeper advances the same timeline.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    sleeps: AtomicUsize,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: AtomicUsize::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of `sleep` calls made so far.
    pub fn sleep_count(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}

/// An absolute point in time fixed once when a wait starts. `None` waits
/// forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A timeout too large to represent as an instant is treated as no
    /// timeout at all.
    pub fn after(clock: &dyn Clock, timeout: Option<Duration>) -> Self {
        Self(timeout.and_then(|t| clock.now().checked_add(t)))
    }

    pub fn unbounded() -> Self {
        Self(None)
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    pub fn is_bounded(&self) -> bool {
        self.0.is_some()
    }

    /// Reaching the deadline exactly counts as expired, so a clock that only
    /// advances on sleep cannot spin at the boundary.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        match self.0 {
            Some(deadline) => clock.now() >= deadline,
            None => false,
        }
    }

    /// Budget left from now, recomputed on every call.
    pub fn remaining(&self, clock: &dyn Clock) -> Option<Duration> {
        self.0
            .map(|deadline| deadline.saturating_duration_since(clock.now()))
    }

    /// Shortens `interval` so a sleep of that length ends no later than the
    /// deadline.
    pub fn clamp(&self, clock: &dyn Clock, interval: Duration) -> Duration {
        match self.remaining(clock) {
            Some(remaining) => interval.min(remaining),
            None => interval,
        }
    }
}
