//! Exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Delay to wait after failed attempt number `attempt` (1-based).
///
/// `base * multiplier^(attempt - 1)`, capped at `max`. Attempt 0 waits nothing.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration, multiplier: f64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let scaled_nanos = base.as_nanos() as f64 * multiplier.powi(exponent);

    if !scaled_nanos.is_finite() || scaled_nanos >= max.as_nanos() as f64 {
        max
    } else {
        Duration::from_nanos(scaled_nanos.max(0.0).round() as u64)
    }
}

/// Add up to `ratio * delay` of random jitter, never exceeding `max`.
pub fn apply_jitter(delay: Duration, ratio: f64, max: Duration) -> Duration {
    if ratio <= 0.0 || delay.is_zero() {
        return delay;
    }

    let jitter_range = (delay.as_millis() as f64 * ratio.min(1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    (delay + Duration::from_millis(jitter)).min(max)
}
