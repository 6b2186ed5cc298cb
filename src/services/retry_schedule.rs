//! Per-attempt timeout scaling and jittered exponential backoff.
//!
//! Pure and stateless given `(attempt_index, config)`: safe to call from any
//! number of concurrent subject tasks without coordination.

use rand::Rng;
use std::time::Duration;

use crate::domain::models::RetrySettings;

/// Timeout ceiling multiplier: attempts get more patient, up to 3x.
const MAX_TIMEOUT_MULTIPLIER: f64 = 3.0;

/// Connect and read timeouts for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl AttemptTimeouts {
    /// Combined deadline for the attempt.
    pub fn total(&self) -> Duration {
        self.connect + self.read
    }
}

/// Computes retry timing: how long to wait for an attempt, and how long to
/// wait before the next one.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
    min_delay: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
    total_timeout_budget: Duration,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetrySchedule {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter_factor: settings.jitter_factor,
            min_delay: Duration::from_millis(settings.min_delay_ms),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            read_timeout: Duration::from_millis(settings.read_timeout_ms),
            total_timeout_budget: Duration::from_millis(settings.total_timeout_budget_ms),
        }
    }
}

impl RetrySchedule {
    /// Timeouts for the given 0-indexed attempt.
    ///
    /// Both timeouts scale by `min(1 + attempt * 0.5, 3.0)`; the read timeout
    /// is then clamped so `connect + read` stays within the total budget.
    pub fn timeouts_for(&self, attempt: u32) -> AttemptTimeouts {
        let multiplier = (1.0 + f64::from(attempt) * 0.5).min(MAX_TIMEOUT_MULTIPLIER);
        let connect = self.connect_timeout.mul_f64(multiplier);
        let read = self.read_timeout.mul_f64(multiplier);

        let read = if connect + read > self.total_timeout_budget {
            self.total_timeout_budget.saturating_sub(connect)
        } else {
            read
        };

        AttemptTimeouts { connect, read }
    }

    /// Backoff before retrying after the given 0-indexed attempt failed.
    ///
    /// Exponential with a cap, then jittered by up to plus/minus
    /// `delay * jitter_factor`, floored at the minimum delay so a retry never
    /// fires immediately.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.raw_delay(attempt);
        let jitter_range = base.as_secs_f64() * self.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        let jittered = (base.as_secs_f64() + jitter).max(self.min_delay.as_secs_f64());
        Duration::from_secs_f64(jittered)
    }

    /// Un-jittered exponential delay: `min(base * 2^attempt, max)`.
    pub fn raw_delay(&self, attempt: u32) -> Duration {
        let millis = u64::try_from(self.base_delay.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(millis).min(self.max_delay)
    }

    /// Delay after a rate-limit response: the provider's hint when present,
    /// else twice the base delay.
    pub fn rate_limit_delay(&self, hint: Option<Duration>) -> Duration {
        hint.unwrap_or(self.base_delay * 2)
            .max(self.min_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> RetrySchedule {
        RetrySchedule::from(&RetrySettings {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.25,
            min_delay_ms: 100,
            connect_timeout_ms: 5_000,
            read_timeout_ms: 60_000,
            total_timeout_budget_ms: 120_000,
        })
    }

    #[test]
    fn timeout_multiplier_scales_then_caps() {
        let s = schedule();

        assert_eq!(s.timeouts_for(0).connect, Duration::from_secs(5));
        assert_eq!(s.timeouts_for(1).connect, Duration::from_millis(7_500));
        assert_eq!(s.timeouts_for(2).connect, Duration::from_secs(10));
        // multiplier caps at 3.0 from attempt 4 onward
        assert_eq!(s.timeouts_for(4).connect, Duration::from_secs(15));
        assert_eq!(s.timeouts_for(9).connect, Duration::from_secs(15));
    }

    #[test]
    fn read_timeout_clamped_to_total_budget() {
        let s = schedule();

        // At 3x, unclamped read would be 180s; budget is 120s.
        let t = s.timeouts_for(4);
        assert_eq!(t.connect, Duration::from_secs(15));
        assert_eq!(t.read, Duration::from_secs(105));
        assert!(t.total() <= Duration::from_secs(120));
    }

    #[test]
    fn raw_delay_doubles_then_caps() {
        let s = schedule();

        assert_eq!(s.raw_delay(0), Duration::from_secs(1));
        assert_eq!(s.raw_delay(1), Duration::from_secs(2));
        assert_eq!(s.raw_delay(2), Duration::from_secs(4));
        assert_eq!(s.raw_delay(4), Duration::from_secs(16));
        assert_eq!(s.raw_delay(5), Duration::from_secs(30)); // capped
        assert_eq!(s.raw_delay(20), Duration::from_secs(30));
    }

    #[test]
    fn raw_delay_is_monotonically_non_decreasing() {
        let s = schedule();
        for attempt in 0..16 {
            assert!(s.raw_delay(attempt + 1) >= s.raw_delay(attempt));
        }
    }

    #[test]
    fn backoff_delay_is_always_positive_and_within_jitter_band() {
        let s = schedule();

        for attempt in 0..8 {
            let raw = s.raw_delay(attempt).as_secs_f64();
            for _ in 0..50 {
                let delay = s.backoff_delay(attempt).as_secs_f64();
                assert!(delay > 0.0);
                assert!(delay >= (raw * 0.75).max(0.1) - 1e-9);
                assert!(delay <= raw * 1.25 + 1e-9);
            }
        }
    }

    #[test]
    fn zero_jitter_returns_raw_delay() {
        let s = RetrySchedule::from(&RetrySettings {
            jitter_factor: 0.0,
            ..RetrySettings::default()
        });

        assert_eq!(s.backoff_delay(2), s.raw_delay(2));
    }

    #[test]
    fn rate_limit_hint_overrides_backoff() {
        let s = schedule();

        assert_eq!(
            s.rate_limit_delay(Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        // No hint: twice the base delay.
        assert_eq!(s.rate_limit_delay(None), Duration::from_secs(2));
        // Hint below the floor is raised to it.
        assert_eq!(
            s.rate_limit_delay(Some(Duration::from_millis(1))),
            Duration::from_millis(100)
        );
    }
}
