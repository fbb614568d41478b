//! Reconnect delay calculation.

use rand::Rng;
use std::time::Duration;

/// Delay before reconnect attempt `attempt` (zero-based).
///
/// Exponential growth capped at `max`, minus up to 10% jitter so a fleet of
/// dashboards dropped by the same restart does not reconnect in lockstep.
/// The result always lies in `[0.9 * capped, capped]` where
/// `capped = min(base * 2^attempt, max)`, which keeps successive delays
/// non-decreasing until the cap is reached.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    let capped = base.saturating_mul(factor).min(max);

    let spread = capped / 10;
    let jitter_ms = if spread.as_millis() == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=spread.as_millis() as u64)
    };

    capped - Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(500);
    const MAX: Duration = Duration::from_secs(30);

    #[test]
    fn test_first_attempt_near_base() {
        for _ in 0..100 {
            let delay = backoff_delay(0, BASE, MAX);
            assert!(delay >= BASE - BASE / 10);
            assert!(delay <= BASE);
        }
    }

    #[test]
    fn test_delays_non_decreasing_until_cap() {
        for _ in 0..100 {
            let mut previous = Duration::ZERO;
            for attempt in 0..10 {
                let delay = backoff_delay(attempt, BASE, MAX);
                assert!(delay >= previous, "delay shrank at attempt {attempt}");
                previous = delay.min(MAX - MAX / 10);
            }
        }
    }

    #[test]
    fn test_delay_never_exceeds_max() {
        for attempt in [6, 7, 10, 100, u32::MAX] {
            for _ in 0..50 {
                assert!(backoff_delay(attempt, BASE, MAX) <= MAX);
            }
        }
    }

    #[test]
    fn test_zero_base_stays_zero() {
        assert_eq!(
            backoff_delay(5, Duration::ZERO, MAX),
            Duration::ZERO
        );
    }
}
