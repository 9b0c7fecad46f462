use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::metrics::Metrics;

// ============================================================================
// Mock API
// ============================================================================
//
// Stand-in for a remote endpoint that randomly succeeds or fails after a
// fixed simulated latency. Used to drive the retry loop in the demo.
//
// ============================================================================

pub const DEFAULT_SUCCESS_RATE: f64 = 0.3;
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(200);

#[derive(Serialize, Clone, Debug)]
pub struct MockResponse {
    pub ok: bool,
    pub request_id: Uuid,
    pub data: MockData,
}

#[derive(Serialize, Clone, Debug)]
pub struct MockData {
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MockApiError {
    #[error("mock failure")]
    Failure,
}

#[derive(Clone)]
pub struct MockApi {
    success_rate: f64,
    latency: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_RATE)
    }
}

impl MockApi {
    /// `success_rate` is clamped to [0, 1]
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };

        Self {
            success_rate,
            latency: DEFAULT_LATENCY,
            metrics: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    pub async fn call(&self) -> Result<MockResponse, MockApiError> {
        tokio::time::sleep(self.latency).await;

        let roll: f64 = rand::thread_rng().gen();
        let success = roll < self.success_rate;

        if let Some(metrics) = &self.metrics {
            metrics.record_mock_call(success);
        }

        if success {
            let response = MockResponse {
                ok: true,
                request_id: Uuid::now_v7(),
                data: MockData {
                    message: "mock success".to_string(),
                    ts: Utc::now(),
                },
            };
            tracing::debug!(request_id = %response.request_id, "Mock API call succeeded");
            Ok(response)
        } else {
            tracing::debug!("Mock API call failed");
            Err(MockApiError::Failure)
        }
    }
}
