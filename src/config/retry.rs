use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rate limiting (429) and the 5xx codes GitHub returns for transient
/// failures.
const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

/// Backoff for GitHub API requests, shared by listing and deletion.
///
/// Delays double from `initial_delay_ms` up to `max_delay_ms`, each spread
/// by up to `jitter` (a fraction) in either direction. A 404 on a retried
/// DELETE is treated as a deletion whose first response was lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt. 0 disables retrying.
    pub max_retries: u32,

    pub initial_delay_ms: u64,

    pub max_delay_ms: u64,

    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            jitter: 0.1,
        }
    }
}

impl RetryConfig {
    /// Whether a response with this status is worth another attempt.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.max_retries > 0 && RETRYABLE_STATUS.contains(&status)
    }

    /// Delay before retry number `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let capped = doubled.min(self.max_delay_ms) as f64;

        let spread = capped * self.jitter.clamp(0.0, 1.0);
        let offset = if spread > 0.0 {
            rand::thread_rng().gen_range(-spread..spread)
        } else {
            0.0
        };

        Duration::from_millis((capped + offset).max(0.0) as u64)
    }
}
