//! Bounded retry with exponential backoff for the primary analysis call.
//!
//! Research and translation calls never go through this: they are single
//! attempt and fail soft.

use std::time::Duration;

use super::types::{GenerationRequest, TextGenerator};
use super::AnalysisError;
use crate::config::RetryConfig;

/// HTTP statuses treated as transient.
pub const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each following retry.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.backoff_base.saturating_mul(factor)
    }

    /// Whether a failed attempt may be retried.
    pub fn is_retryable(error: &AnalysisError) -> bool {
        match error {
            AnalysisError::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
            AnalysisError::Connection(_) => true,
            _ => false,
        }
    }

    /// Run one generation request under this policy.
    pub fn generate(
        &self,
        generator: &dyn TextGenerator,
        request: &GenerationRequest,
    ) -> Result<String, AnalysisError> {
        self.run(|| generator.generate(request), std::thread::sleep)
    }

    /// Core loop with an injectable sleep.
    pub fn run<T, F, S>(&self, mut op: F, mut sleep: S) -> Result<T, AnalysisError>
    where
        F: FnMut() -> Result<T, AnalysisError>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && Self::is_retryable(&e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Analysis call failed, retrying"
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
