//! Full-jitter exponential backoff (spec §4.1.4).

use std::time::Duration;

/// Computes `delay_i = min(max_delay, initial_delay * exponent^i)` and then
/// applies full jitter: a uniformly random duration in `[0, delay_i]`.
///
/// `attempt` is zero-based: `attempt = 0` is the delay before the *second*
/// attempt (the first retry).
pub fn full_jitter_delay(
    attempt: u32,
    initial_delay: Duration,
    exponent: f64,
    max_delay: Duration,
) -> Duration {
    let capped_delay = capped_exponential_delay(attempt, initial_delay, exponent, max_delay);
    let jitter_fraction: f64 = rand::random();
    capped_delay.mul_f64(jitter_fraction)
}

fn capped_exponential_delay(
    attempt: u32,
    initial_delay: Duration,
    exponent: f64,
    max_delay: Duration,
) -> Duration {
    let factor = exponent.powi(attempt as i32);
    let scaled_millis = initial_delay.as_secs_f64() * 1000.0 * factor;
    if !scaled_millis.is_finite() || scaled_millis >= max_delay.as_secs_f64() * 1000.0 {
        return max_delay;
    }
    Duration::from_millis(scaled_millis.round() as u64).min(max_delay)
}
