use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::metrics::Metrics;

// ============================================================================
// Fixed-Delay Retry Strategy
// ============================================================================
//
// Runs an async operation and retries it on failure, up to a fixed retry
// budget, waiting a constant delay between attempts. Every attempt failure is
// treated as transient; only exhaustion of the budget reaches the caller.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay between a failed attempt and the next one
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total attempts permitted: the first one plus `max_retries` retries
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Terminal failure once the retry budget is spent.
///
/// The message names the configured retry budget, not the number of attempts
/// made (which is always one more).
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("All {max_retries} retries failed. Last error: {last_error}")]
    Exhausted { max_retries: u32, last_error: E },
}

impl<E> RetryError<E> {
    pub fn max_retries(&self) -> u32 {
        match self {
            RetryError::Exhausted { max_retries, .. } => *max_retries,
        }
    }

    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }

    pub fn into_last_error(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }
}

/// Executes operations under a [`RetryConfig`], optionally reporting to
/// Prometheus.
#[derive(Clone)]
pub struct RetryRunner {
    config: RetryConfig,
    metrics: Option<Arc<Metrics>>,
    operation_name: String,
}

impl Default for RetryRunner {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryRunner {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            metrics: None,
            operation_name: "operation".to_string(),
        }
    }

    /// Record attempts, delays and outcomes under the given operation label
    pub fn with_metrics(mut self, metrics: Arc<Metrics>, operation_name: impl Into<String>) -> Self {
        self.metrics = Some(metrics);
        self.operation_name = operation_name.into();
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds or the retry budget is exhausted.
    ///
    /// Each call to `operation` is a fresh attempt. Failures are logged and
    /// swallowed; only the last one is returned, wrapped in
    /// [`RetryError::Exhausted`].
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            tracing::debug!(
                operation = %self.operation_name,
                attempt = attempt,
                max_attempts = max_attempts,
                "Attempting operation"
            );
            self.record_attempt(attempt);

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            operation = %self.operation_name,
                            attempt = attempt,
                            "Operation succeeded after retry"
                        );
                    } else {
                        tracing::info!(
                            operation = %self.operation_name,
                            attempt = attempt,
                            "Operation succeeded"
                        );
                    }
                    self.record_outcome(attempt, true);
                    return Ok(value);
                }
                Err(error) => {
                    tracing::warn!(
                        operation = %self.operation_name,
                        attempt = attempt,
                        error = %error,
                        "Attempt failed"
                    );

                    if attempt >= max_attempts {
                        tracing::error!(
                            operation = %self.operation_name,
                            attempts = attempt,
                            max_retries = self.config.max_retries,
                            error = %error,
                            "Operation failed after all retries"
                        );
                        self.record_outcome(attempt, false);
                        return Err(RetryError::Exhausted {
                            max_retries: self.config.max_retries,
                            last_error: error,
                        });
                    }

                    tracing::info!(
                        operation = %self.operation_name,
                        delay_ms = self.config.delay.as_millis() as u64,
                        "Waiting before retrying"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_retry_delay(&self.operation_name);
                    }

                    sleep(self.config.delay).await;
                }
            }
        }
    }

    fn record_attempt(&self, attempt: u32) {
        if let Some(metrics) = &self.metrics {
            metrics.record_retry_attempt(&self.operation_name, attempt);
        }
    }

    fn record_outcome(&self, attempts: u32, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_retry_outcome(&self.operation_name, attempts, success);
        }
    }
}

/// Run `operation` under `config` without metrics
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: RetryConfig,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryRunner::new(config).run(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    type Attempt = std::pin::Pin<Box<dyn Future<Output = Result<u32, String>> + Send>>;

    /// Fails until the counter reaches `succeed_on`, recording when each attempt started.
    fn flaky(
        counter: Arc<AtomicU32>,
        starts: Arc<Mutex<Vec<Instant>>>,
        succeed_on: u32,
    ) -> impl FnMut() -> Attempt {
        move || -> Attempt {
            let counter = counter.clone();
            let starts = starts.clone();
            Box::pin(async move {
                starts.lock().unwrap().push(Instant::now());
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt >= succeed_on {
                    Ok(attempt)
                } else {
                    Err(format!("failure on attempt {}", attempt))
                }
            })
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.delay, Duration::from_millis(1000));
        assert_eq!(config.max_attempts(), 4);
    }

    #[test]
    fn test_config_builders() {
        let config = RetryConfig::default()
            .with_max_retries(0)
            .with_delay(Duration::ZERO);
        assert_eq!(config, RetryConfig::new(0, 0));
        assert_eq!(config.max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let config = RetryConfig::new(5, 100);

        let began = Instant::now();
        let result = fetch_with_retry(config, flaky(counter.clone(), starts.clone(), 3)).await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(began.elapsed() >= Duration::from_millis(200));

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn test_always_fails_exhausts_budget() {
        let counter = Arc::new(AtomicU32::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let config = RetryConfig::new(2, 50);

        let result = fetch_with_retry(config, flaky(counter.clone(), starts.clone(), u32::MAX)).await;

        let err = result.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(err.max_retries(), 2);
        assert_eq!(err.last_error(), "failure on attempt 3");
        assert_eq!(
            err.to_string(),
            "All 2 retries failed. Last error: failure on attempt 3"
        );

        let starts = starts.lock().unwrap();
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(50));
        }
    }

    #[tokio::test]
    async fn test_immediate_success_never_waits() {
        let counter = Arc::new(AtomicU32::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let config = RetryConfig::new(3, 1000);

        let began = Instant::now();
        let result = fetch_with_retry(config, flaky(counter.clone(), starts, 1)).await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(began.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let config = RetryConfig::new(0, 1000);

        let began = Instant::now();
        let result = fetch_with_retry(config, flaky(counter.clone(), starts, 2)).await;

        let err = result.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(err.max_retries(), 0);
        assert!(began.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_zero_delay_retries_back_to_back() {
        let counter = Arc::new(AtomicU32::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));
        let config = RetryConfig::new(4, 0);

        let result = fetch_with_retry(config, flaky(counter.clone(), starts, 5)).await;

        assert_eq!(result.unwrap(), 5);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_last_error_is_preserved() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = fetch_with_retry(RetryConfig::new(3, 0), || {
            let counter = counter_clone.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(format!("error #{}", n))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().into_last_error(), "error #4");
    }

    #[tokio::test]
    async fn test_runner_records_metrics() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let runner = RetryRunner::new(RetryConfig::new(5, 10)).with_metrics(metrics.clone(), "flaky");
        let counter = Arc::new(AtomicU32::new(0));
        let starts = Arc::new(Mutex::new(Vec::new()));

        runner.run(flaky(counter, starts, 3)).await.unwrap();

        assert_eq!(metrics.retry_attempts_total.with_label_values(&["flaky", "1"]).get(), 1);
        assert_eq!(metrics.retry_attempts_total.with_label_values(&["flaky", "3"]).get(), 1);
        assert_eq!(metrics.retry_delays_total.with_label_values(&["flaky"]).get(), 2);
        assert_eq!(metrics.retry_success.with_label_values(&["flaky"]).get(), 1);
        assert_eq!(metrics.retry_failure.with_label_values(&["flaky"]).get(), 0);
    }

    #[tokio::test]
    async fn test_independent_runs_do_not_interfere() {
        let runner = RetryRunner::new(RetryConfig::new(3, 20));
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let (a, b) = futures_util::future::join(
            runner.run(flaky(first.clone(), Arc::new(Mutex::new(Vec::new())), 2)),
            runner.run(flaky(second.clone(), Arc::new(Mutex::new(Vec::new())), u32::MAX)),
        )
        .await;

        assert_eq!(a.unwrap(), 2);
        assert!(b.is_err());
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 4);
    }
}
