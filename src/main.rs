use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fetch_retry::config::DemoConfig;
use fetch_retry::metrics::{self, Metrics};
use fetch_retry::mock::MockApi;
use fetch_retry::RetryRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fetch_retry=debug"))
        )
        .init();

    let config = DemoConfig::parse();

    tracing::info!(
        max_retries = config.max_retries,
        delay_ms = config.delay_ms,
        success_rate = config.success_rate,
        latency_ms = config.latency_ms,
        "🚀 Starting fetch-with-retry demo"
    );

    let metrics = Arc::new(Metrics::new()?);

    // Metrics server gets its own thread and actix system
    if let Some(port) = config.metrics_port {
        let metrics_registry = Arc::new(metrics.registry().clone());
        std::thread::spawn(move || {
            let system = actix_web::rt::System::new();
            if let Err(e) = system.block_on(metrics::start_metrics_server(metrics_registry, port)) {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    let api = MockApi::new(config.success_rate)
        .with_latency(config.latency())
        .with_metrics(metrics.clone());

    let runner = RetryRunner::new(config.retry_config()).with_metrics(metrics, "mock_api_call");

    match runner.run(|| api.call()).await {
        Ok(response) => {
            println!("Final result: {}", serde_json::to_string_pretty(&response)?);
            tracing::info!("🎉 Demo complete!");
            Ok(())
        }
        Err(e) => {
            eprintln!("Final error: {}", e);
            std::process::exit(1);
        }
    }
}
