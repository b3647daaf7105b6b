//! Centralized error handling for favicon-recon
//!
//! # Error Categories
//!
//! - **Validation Errors**: malformed domain strings, rejected before batching
//! - **Fetch Errors**: transport, timeout and HTTP status failures of a batch request
//! - **Decode Errors**: composite images that cannot be split into slots
//! - **Cache Inconsistencies**: entries that fail a sanity check, treated as misses
//! - **Configuration Errors**: the only fatal category, raised before any batch runs
//!
//! # Usage
//!
//! ```rust
//! use favicon_recon::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for batch fetch Results
pub type FetchResult<T> = Result<T, FetchError>;

/// Convenience type alias for composite decode Results
pub type DecodeResult<T> = Result<T, DecodeError>;
