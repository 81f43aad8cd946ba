//! Retry policy for failed deliveries.
//!
//! Bounded exponential backoff with a hard cap. Exhausted and skipped
//! retries are terminal and only logged by the dispatcher.

use super::notification::{DEFAULT_DELAY_SECONDS, Notification};
use crate::error::AppError;

/// Ceiling of the default backoff in seconds
pub const MAX_BACKOFF_SECONDS: f64 = 60.0;

/// What to do after a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// Re-enqueue through the delayed set with this attempt number
    Retry { attempt: u32, backoff_seconds: f64 },
    /// The retry limit is used up
    Exhausted { retry_limit: u32 },
    /// The notification declined to retry this error
    Skipped,
}

/// Default policy: `min(60, delay * 2^attempt)` where `attempt` is the
/// attempt that just failed.
pub fn default_backoff(delay_seconds: Option<f64>, attempt: u32) -> f64 {
    let base = delay_seconds
        .filter(|d| d.is_finite())
        .unwrap_or(DEFAULT_DELAY_SECONDS)
        .max(0.0);
    let factor = 2f64.powi(attempt.min(64) as i32);
    (base * factor).min(MAX_BACKOFF_SECONDS)
}

/// Decide the follow-up for a notification that failed on `attempt`.
pub fn decide(notification: &dyn Notification, error: &AppError, attempt: u32) -> RetryDecision {
    let next_attempt = attempt.saturating_add(1);
    let retry_limit = notification.retry_limit();

    if next_attempt > retry_limit {
        return RetryDecision::Exhausted { retry_limit };
    }

    if !notification.should_retry(error, attempt) {
        return RetryDecision::Skipped;
    }

    let backoff_seconds = notification
        .backoff(next_attempt, error)
        .filter(|s| s.is_finite())
        .unwrap_or_else(|| default_backoff(notification.delay_seconds(), attempt))
        .max(0.0);

    RetryDecision::Retry {
        attempt: next_attempt,
        backoff_seconds,
    }
}
