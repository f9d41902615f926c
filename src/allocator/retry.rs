//! Retry budget for allocation commit conflicts.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Bounded retry with exponential backoff for conflicting commits.
///
/// A conflict means another caller committed between our counter read and
/// our write; the whole read-modify-write is re-run from a fresh read, so
/// retries are cheap and short delays suffice.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: usize,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 10,
            max_delay_ms: 500,
        }
    }
}

impl RetryConfig {
    /// Creates a RetryConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ORDERSEQ_TXN_MAX_RETRIES`: Maximum retry attempts (default: 5)
    /// - `ORDERSEQ_TXN_RETRY_INITIAL_MS`: Initial backoff delay in ms (default: 10)
    /// - `ORDERSEQ_TXN_RETRY_MAX_MS`: Maximum backoff delay in ms (default: 500)
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_retries: std::env::var("ORDERSEQ_TXN_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_retries),
            initial_delay_ms: std::env::var("ORDERSEQ_TXN_RETRY_INITIAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.initial_delay_ms),
            max_delay_ms: std::env::var("ORDERSEQ_TXN_RETRY_MAX_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_delay_ms),
        }
    }

    /// Creates an exponential backoff builder with jitter.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}
