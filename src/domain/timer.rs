/// Countdown timer with pause/resume, plus a dt-driven step pacer.
///
/// `CountdownTimer` has three states:
///   - **Idle**   : not started yet. Remaining = limit, never times out.
///   - **Running**: elapsed = now - start.
///   - **Paused** : elapsed frozen in an accumulator.
///
/// `resume()` rebases `start` to `now - accumulated`, so time spent paused
/// never leaks into the countdown.

use std::fmt;
use std::rc::Rc;

use super::clock::Clock;

#[derive(Clone, Copy, PartialEq, Debug)]
enum TimerState {
    Idle,
    Running { start: f64 },
    Paused { elapsed: f64 },
}

pub struct CountdownTimer {
    clock: Rc<dyn Clock>,
    limit: f64,
    state: TimerState,
}

impl CountdownTimer {
    /// Timer that begins counting immediately.
    pub fn started(clock: Rc<dyn Clock>, limit: f64) -> Self {
        let start = clock.now();
        CountdownTimer { clock, limit, state: TimerState::Running { start } }
    }

    /// Timer that waits for an explicit `start()`.
    pub fn idle(clock: Rc<dyn Clock>, limit: f64) -> Self {
        CountdownTimer { clock, limit, state: TimerState::Idle }
    }

    /// Begin counting. No-op unless idle.
    pub fn start(&mut self) {
        if self.state == TimerState::Idle {
            self.state = TimerState::Running { start: self.clock.now() };
        }
    }

    /// Reset elapsed to zero and count from now.
    pub fn restart(&mut self) {
        self.state = TimerState::Running { start: self.clock.now() };
    }

    /// Back to idle (used by puzzle re-setup).
    pub fn reset_idle(&mut self) {
        self.state = TimerState::Idle;
    }

    pub fn pause(&mut self) {
        if let TimerState::Running { start } = self.state {
            self.state = TimerState::Paused { elapsed: self.clock.now() - start };
        }
    }

    pub fn resume(&mut self) {
        if let TimerState::Paused { elapsed } = self.state {
            self.state = TimerState::Running { start: self.clock.now() - elapsed };
        }
    }

    pub fn elapsed(&self) -> f64 {
        match self.state {
            TimerState::Idle => 0.0,
            TimerState::Running { start } => (self.clock.now() - start).max(0.0),
            TimerState::Paused { elapsed } => elapsed,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.limit - self.elapsed()).max(0.0)
    }

    pub fn is_time_up(&self) -> bool {
        match self.state {
            TimerState::Idle => false,
            _ => self.elapsed() >= self.limit,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, TimerState::Paused { .. })
    }

    pub fn is_started(&self) -> bool {
        self.state != TimerState::Idle
    }

    /// Counting right now (started and not paused).
    pub fn is_active(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn scale_limit(&mut self, factor: f64) {
        self.limit *= factor;
    }
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("limit", &self.limit)
            .field("state", &self.state)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Fixed-interval pacer fed by frame deltas.
/// Demonstration phases reveal one item per `interval` seconds of `update(dt)`.
#[derive(Clone, Debug)]
pub struct Cadence {
    interval: f64,
    acc: f64,
}

impl Cadence {
    pub fn new(interval: f64) -> Self {
        Cadence { interval, acc: 0.0 }
    }

    /// Accumulate `dt`; returns how many whole intervals elapsed.
    pub fn tick(&mut self, dt: f64) -> u32 {
        if self.interval <= 0.0 {
            return 1;
        }
        self.acc += dt.max(0.0);
        let mut steps = 0;
        while self.acc >= self.interval {
            self.acc -= self.interval;
            steps += 1;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.acc = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    fn clock() -> Rc<ManualClock> {
        Rc::new(ManualClock::new(100.0))
    }

    #[test]
    fn counts_down_while_running() {
        let c = clock();
        let t = CountdownTimer::started(c.clone(), 30.0);
        c.advance(10.0);
        assert!((t.remaining() - 20.0).abs() < 1e-9);
        assert!(!t.is_time_up());
        c.advance(20.0);
        assert_eq!(t.remaining(), 0.0);
        assert!(t.is_time_up());
    }

    #[test]
    fn remaining_never_negative() {
        let c = clock();
        let t = CountdownTimer::started(c.clone(), 5.0);
        c.advance(50.0);
        assert_eq!(t.remaining(), 0.0);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let c = clock();
        let mut t = CountdownTimer::started(c.clone(), 30.0);
        c.advance(5.0);
        t.pause();
        c.advance(100.0); // paused: must not count
        assert!((t.remaining() - 25.0).abs() < 1e-9);
        assert!(!t.is_time_up());
        t.resume();
        c.advance(5.0);
        assert!((t.remaining() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn pause_then_immediate_resume_is_noop() {
        let c = clock();
        let mut t = CountdownTimer::started(c.clone(), 30.0);
        c.advance(7.0);
        let before = t.remaining();
        t.pause();
        t.resume();
        assert!((t.remaining() - before).abs() < 1e-9);
    }

    #[test]
    fn double_pause_and_spurious_resume_are_idempotent() {
        let c = clock();
        let mut t = CountdownTimer::started(c.clone(), 30.0);
        c.advance(3.0);
        t.pause();
        c.advance(4.0);
        t.pause(); // must not re-capture
        assert!((t.elapsed() - 3.0).abs() < 1e-9);
        t.resume();
        t.resume(); // not paused: no-op
        c.advance(1.0);
        assert!((t.elapsed() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn time_up_while_paused_uses_accumulator() {
        let c = clock();
        let mut t = CountdownTimer::started(c.clone(), 10.0);
        c.advance(10.0);
        t.pause();
        assert!(t.is_time_up());
    }

    #[test]
    fn idle_timer_never_expires() {
        let c = clock();
        let mut t = CountdownTimer::idle(c.clone(), 10.0);
        c.advance(1000.0);
        assert!(!t.is_time_up());
        assert_eq!(t.remaining(), 10.0);
        t.pause(); // idle: no-op
        assert!(!t.is_paused());
        t.start();
        c.advance(4.0);
        assert!((t.remaining() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn scale_limit_extends_remaining() {
        let c = clock();
        let mut t = CountdownTimer::started(c.clone(), 20.0);
        c.advance(10.0);
        t.scale_limit(1.5);
        assert!((t.remaining() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn cadence_counts_whole_intervals() {
        let mut cad = Cadence::new(1.0);
        assert_eq!(cad.tick(0.4), 0);
        assert_eq!(cad.tick(0.4), 0);
        assert_eq!(cad.tick(0.4), 1); // 1.2 total
        assert_eq!(cad.tick(2.0), 2); // 0.2 + 2.0
        cad.reset();
        assert_eq!(cad.tick(0.9), 0);
    }
}
