use std::future::Future;
use std::time::Duration;

use super::error::ClientError;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Linear retry schedule for transient failures.
///
/// Retry `n` (1-based) waits `n * base_delay`. Only transport failures and
/// 5xx responses are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }

    pub fn should_retry(&self, err: &ClientError, retries_done: u32) -> bool {
        retries_done < self.max_retries && err.is_transient()
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut retries = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err, retries) => {
                    retries += 1;
                    let delay = self.delay_for(retries);
                    tracing::warn!(
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying {}: {}",
                        label,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
