//! Exponential backoff for reconnect scheduling.

use std::time::Duration;

/// Delay before reconnect attempt `attempt` (1-based), in milliseconds.
///
/// `delay = base * 2^(attempt - 1)`, saturating instead of overflowing.
/// Attempt 0 is treated like attempt 1. When `cap_ms` is set the result is
/// clamped to it; no jitter is applied.
pub fn reconnect_delay_ms(base_ms: u64, attempt: u32, cap_ms: Option<u64>) -> u64 {
    let exponent = attempt.saturating_sub(1);
    let delay = base_ms.saturating_mul(2u64.saturating_pow(exponent));
    match cap_ms {
        Some(cap) => delay.min(cap),
        None => delay,
    }
}

/// [`reconnect_delay_ms`] as a `Duration`.
pub fn reconnect_delay(base_ms: u64, attempt: u32, cap_ms: Option<u64>) -> Duration {
    Duration::from_millis(reconnect_delay_ms(base_ms, attempt, cap_ms))
}
