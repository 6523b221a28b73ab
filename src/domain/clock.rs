/// Clock sources.
///
/// Every time-dependent rule (puzzle countdown, anomaly expiry, ability
/// cooldowns) samples `now()` when an event or update arrives. The session
/// shares one clock as `Rc<dyn Clock>`; tests drive a `ManualClock`.

use std::cell::Cell;
use std::time::Instant;

pub trait Clock {
    /// Monotonic seconds since an arbitrary origin.
    fn now(&self) -> f64;
}

/// Wall clock backed by `Instant`, origin = construction time.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock for tests and headless hosts.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        ManualClock { now: Cell::new(start) }
    }

    pub fn set(&self, t: f64) {
        self.now.set(t);
    }

    pub fn advance(&self, dt: f64) {
        self.now.set(self.now.get() + dt);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let c = ManualClock::new(2.0);
        assert_eq!(c.now(), 2.0);
        c.advance(1.5);
        assert_eq!(c.now(), 3.5);
        c.set(10.0);
        assert_eq!(c.now(), 10.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let c = SystemClock::new();
        let a = c.now();
        let b = c.now();
        assert!(b >= a);
    }
}
