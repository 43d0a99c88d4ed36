//! Retry delay strategies
//!
//! This module turns a `RetryPolicy` into the delay to wait before the next
//! attempt. The engine additionally clamps the result so delays never
//! shrink within one session.

use std::time::Duration;

use rand::Rng;

use crate::types::{RetryPolicy, RetryStrategy};

/// Delay to wait after `attempt` (1-indexed) before probing again
///
/// The strategy's raw delay is capped at `max_delay_ms`; with `jitter` up
/// to a quarter of the capped delay is added on top.
///
/// ```rust
/// use keel_core::retry::calculate_delay;
/// use keel_core::types::RetryPolicy;
///
/// // Defaults: exponential, 500 ms doubling, capped at 5 s
/// let policy = RetryPolicy::default();
///
/// assert_eq!(calculate_delay(&policy, 1, false).as_millis(), 500);
/// assert_eq!(calculate_delay(&policy, 2, false).as_millis(), 1000);
/// assert_eq!(calculate_delay(&policy, 10, false).as_millis(), 5000);
/// ```
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32, jitter: bool) -> Duration {
    let delay_ms = raw_delay_ms(policy, attempt.max(1)).min(policy.max_delay_ms);
    if jitter {
        Duration::from_millis(delay_ms.saturating_add(jitter_ms(delay_ms)))
    } else {
        Duration::from_millis(delay_ms)
    }
}

fn raw_delay_ms(policy: &RetryPolicy, attempt: u32) -> u64 {
    let initial = policy.initial_delay_ms;
    let steps = attempt - 1;

    match policy.strategy {
        RetryStrategy::None => 0,
        RetryStrategy::FixedDelay => initial,
        RetryStrategy::LinearBackoff => initial.saturating_mul(u64::from(attempt)),
        RetryStrategy::ExponentialBackoff => {
            // A factor below 1 would shrink delays; treat it as fixed
            let growth = policy.backoff_multiplier.max(1.0).powi(steps.min(i32::MAX as u32) as i32);
            // Float-to-int casts saturate, so runaway growth lands on u64::MAX
            (initial as f64 * growth) as u64
        }
    }
}

fn jitter_ms(delay_ms: u64) -> u64 {
    match delay_ms / 4 {
        0 => 0,
        spread => rand::rng().random_range(0..=spread),
    }
}
