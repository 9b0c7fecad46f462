pub mod retry;

pub use retry::{fetch_with_retry, RetryConfig, RetryError, RetryRunner};
