//! Bounded, fixed-delay retries for async operations.
//!
//! [`utils::RetryRunner`] calls an operation until it succeeds or its retry
//! budget runs out, waiting a constant delay between attempts. The `mock`,
//! `config` and `metrics` modules support the demo binary.

pub mod config;
pub mod metrics;
pub mod mock;
pub mod utils;

pub use utils::{fetch_with_retry, RetryConfig, RetryError, RetryRunner};
