//! Wall-clock abstraction.
//!
//! Key expiry, synchronization watermarks, dump deadlines and the pacing
//! delay between dumped rows all read time through a [`Clock`], so tests
//! can drive them with a [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Time elapsed since the Unix epoch.
    fn now(&self) -> Duration;

    /// Blocks (or pretends to block) for the given duration.
    fn sleep(&self, duration: Duration);

    /// Whole seconds since the Unix epoch.
    fn unix_secs(&self) -> u64 {
        self.now().as_secs()
    }
}

/// The operating-system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// A clock that only moves when told to.
///
/// `sleep` advances the clock instead of blocking, so paced loops run
/// instantly while still observing the time they would have taken.
///
/// # Example
///
/// ```rust
/// use tblcache_kv::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::starting_at(100);
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.unix_secs(), 105);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Creates a clock at the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock at the given Unix second.
    #[must_use]
    pub fn starting_at(secs: u64) -> Self {
        Self {
            micros: AtomicU64::new(secs.saturating_mul(1_000_000)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let micros = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        self.micros.fetch_add(micros, Ordering::SeqCst);
    }

    /// Jumps to the given Unix second.
    pub fn set_secs(&self, secs: u64) {
        self.micros
            .store(secs.saturating_mul(1_000_000), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
