//! Sources of the default reference timestamp.

use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies "now" as unix seconds.
pub trait Clock {
    /// Current time in unix seconds.
    fn now(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// Wall clock rounded down to a multiple of `step` seconds.
///
/// ```rust
/// use simple_rrd::clock::{AlignedClock, Clock};
///
/// let clock = AlignedClock::new(60);
/// assert_eq!(clock.now() % 60, 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AlignedClock<C = SystemClock> {
    inner: C,
    step: u64,
}

impl AlignedClock {
    /// Aligns the system clock to `step` seconds.
    pub fn new(step: u64) -> Self {
        Self::wrap(SystemClock, step)
    }
}

impl<C: Clock> AlignedClock<C> {
    /// Aligns an arbitrary clock to `step` seconds. A zero step disables alignment.
    pub fn wrap(inner: C, step: u64) -> Self {
        Self { inner, step }
    }
}

impl<C: Clock> Clock for AlignedClock<C> {
    fn now(&self) -> u64 {
        let now = self.inner.now();
        if self.step == 0 {
            now
        } else {
            now - now % self.step
        }
    }
}
