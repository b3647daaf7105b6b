//! Shared helpers
//!
//! - `retry` for backoff around batch requests
//! - `validation` for hostname normalization

pub mod retry;
pub mod validation;

pub use retry::{RetryConfig, with_retry};
pub use validation::{normalize_hostname, validate_hostname};
