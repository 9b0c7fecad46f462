use clap::Parser;
use std::time::Duration;

use crate::utils::RetryConfig;

// ============================================================================
// Demo Configuration
// ============================================================================
//
// Command-line flags for the demo binary. Every flag can also be supplied
// through its FETCH_RETRY_* environment variable.
//
// ============================================================================

#[derive(Parser, Debug, Clone)]
#[command(name = "fetch_retry")]
#[command(version)]
#[command(about = "Call a flaky mock API with bounded, fixed-delay retries", long_about = None)]
pub struct DemoConfig {
    /// Retries allowed after the first attempt
    #[arg(long, env = "FETCH_RETRY_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    /// Delay between attempts, in milliseconds
    #[arg(long, env = "FETCH_RETRY_DELAY_MS", default_value_t = 1000)]
    pub delay_ms: u64,

    /// Probability in [0, 1] that a mock call succeeds
    #[arg(long, env = "FETCH_RETRY_SUCCESS_RATE", default_value_t = 0.3)]
    pub success_rate: f64,

    /// Simulated latency of each mock call, in milliseconds
    #[arg(long, env = "FETCH_RETRY_LATENCY_MS", default_value_t = 200)]
    pub latency_ms: u64,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "FETCH_RETRY_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl DemoConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries, self.delay_ms)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}
