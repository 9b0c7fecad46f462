// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for retried operations
// ============================================================================
//
// Provides metrics for:
// - Individual attempts, labelled by attempt number
// - Delays waited between attempts
// - Final outcome of each retried call and how many attempts it took
// - Mock API call outcomes
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the application
pub struct Metrics {
    registry: Registry,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,
    pub retry_delays_total: IntCounterVec,
    pub retry_success: IntCounterVec,
    pub retry_failure: IntCounterVec,
    pub retry_attempts_per_call: HistogramVec,

    // Mock API Metrics
    pub mock_api_calls: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total attempts made by retried operations"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let retry_delays_total = IntCounterVec::new(
            Opts::new("retry_delays_total", "Total delays waited between attempts"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_delays_total.clone()))?;

        let retry_success = IntCounterVec::new(
            Opts::new("retry_success_total", "Total retried operations that succeeded"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_success.clone()))?;

        let retry_failure = IntCounterVec::new(
            Opts::new("retry_failure_total", "Total retried operations that exhausted their retries"),
            &["operation"],
        )?;
        registry.register(Box::new(retry_failure.clone()))?;

        let retry_attempts_per_call = HistogramVec::new(
            HistogramOpts::new("retry_attempts_per_call", "Attempts needed per retried operation")
                .buckets(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0]),
            &["operation"],
        )?;
        registry.register(Box::new(retry_attempts_per_call.clone()))?;

        let mock_api_calls = IntCounterVec::new(
            Opts::new("mock_api_calls_total", "Total mock API calls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(mock_api_calls.clone()))?;

        Ok(Self {
            registry,
            retry_attempts_total,
            retry_delays_total,
            retry_success,
            retry_failure,
            retry_attempts_per_call,
            mock_api_calls,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a single attempt
    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        self.retry_attempts_total.with_label_values(&[operation, &attempt.to_string()]).inc();
    }

    /// Helper to record a delay between attempts
    pub fn record_retry_delay(&self, operation: &str) {
        self.retry_delays_total.with_label_values(&[operation]).inc();
    }

    /// Helper to record the final outcome of a retried operation
    pub fn record_retry_outcome(&self, operation: &str, attempts: u32, success: bool) {
        if success {
            self.retry_success.with_label_values(&[operation]).inc();
        } else {
            self.retry_failure.with_label_values(&[operation]).inc();
        }
        self.retry_attempts_per_call.with_label_values(&[operation]).observe(attempts as f64);
    }

    pub fn record_mock_call(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.mock_api_calls.with_label_values(&[outcome]).inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
