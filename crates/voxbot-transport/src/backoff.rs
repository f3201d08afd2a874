//! Reconnect pacing: [`Backoff`] and [`CoolDownGuard`].
//!
//! [`Backoff`] is owned by the connection worker and spaces out its reconnect
//! attempts.  [`CoolDownGuard`] is consulted by callers: after a connect
//! attempt fails, calls inside the window fail fast instead of each paying
//! the full connect wait while the endpoint is known to be down.

use std::time::{Duration, Instant};

/// Exponential reconnect delay: `base, 2·base, 4·base, …` capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempt: 0,
            base_delay,
            max_delay,
        }
    }

    /// Delay to sleep before the next attempt.  Advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Restart the sequence at `base`.  Called after a successful connect.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Fail-fast window after a failed connect.
#[derive(Debug, Clone)]
pub struct CoolDownGuard {
    failed: bool,
    last_attempt: Option<Instant>,
    window: Duration,
}

impl CoolDownGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            failed: false,
            last_attempt: None,
            window,
        }
    }

    /// `true` when the last connect attempt failed less than `window` before
    /// `now`.
    pub fn should_skip(&self, now: Instant) -> bool {
        match (self.failed, self.last_attempt) {
            (true, Some(at)) => now.saturating_duration_since(at) < self.window,
            _ => false,
        }
    }

    /// Stamp the start of a connect attempt.
    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Mark the most recent attempt as failed.
    pub fn trip(&mut self) {
        self.failed = true;
    }

    /// Forget the failure after a successful connect.
    pub fn clear(&mut self) {
        self.failed = false;
    }

    pub fn is_tripped(&self) -> bool {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn delays_double_until_capped() {
        let mut b = Backoff::new(ms(100), ms(1000));
        let seq: Vec<_> = (0..7).map(|_| b.next_delay()).collect();
        assert_eq!(
            seq,
            vec![ms(100), ms(200), ms(400), ms(800), ms(1000), ms(1000), ms(1000)]
        );
    }

    #[test]
    fn reset_returns_to_base_delay() {
        let mut b = Backoff::new(ms(100), ms(1000));
        b.next_delay();
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.attempt(), 0);
        assert_eq!(b.next_delay(), ms(100));
        assert_eq!(b.next_delay(), ms(200));
    }

    #[test]
    fn long_failure_streak_does_not_overflow() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        for _ in 0..200 {
            assert!(b.next_delay() <= Duration::from_secs(30));
        }
    }

    #[test]
    fn fresh_guard_never_skips() {
        let guard = CoolDownGuard::new(Duration::from_secs(60));
        assert!(!guard.should_skip(Instant::now()));
    }

    #[test]
    fn tripped_guard_skips_inside_window_only() {
        let mut guard = CoolDownGuard::new(ms(500));
        let t0 = Instant::now();
        guard.record_attempt(t0);
        guard.trip();

        assert!(guard.should_skip(t0 + ms(100)));
        assert!(guard.should_skip(t0 + ms(499)));
        assert!(!guard.should_skip(t0 + ms(500)));
        assert!(!guard.should_skip(t0 + ms(2000)));
    }

    #[test]
    fn clear_disarms_guard() {
        let mut guard = CoolDownGuard::new(Duration::from_secs(60));
        let t0 = Instant::now();
        guard.record_attempt(t0);
        guard.trip();
        assert!(guard.is_tripped());
        guard.clear();
        assert!(!guard.should_skip(t0));
    }
}
