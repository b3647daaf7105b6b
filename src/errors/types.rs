//! Error type definitions for favicon-recon
//!
//! The pipeline never aborts a run because of a single domain or batch. Each
//! layer below has its own error enum; fetch and decode failures are
//! downgraded to per-domain results by the worker that hit them, and only
//! configuration problems surface as a fatal [`AppError`].

use thiserror::Error;

/// Top-level application error type
///
/// Returned by operations that can stop a run before any batch is issued:
/// configuration loading, HTTP client construction and input validation.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Domain validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Batch fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Composite image decode errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Layered configuration extraction errors
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Wordlist and config file IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection reasons for a domain string
///
/// Raised before batching; a rejected domain never enters the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Nothing left after trimming
    #[error("Domain is empty")]
    Empty,

    /// Input could not be parsed as a host at all
    #[error("'{input}' is not a valid hostname: {reason}")]
    InvalidHost { input: String, reason: String },

    /// Host is an IP literal rather than a name
    #[error("'{input}' is an IP address, not a domain")]
    IpAddress { input: String },

    /// Host is longer than DNS allows
    #[error("'{input}' exceeds {max} characters")]
    TooLong { input: String, max: usize },

    /// A single label breaks DNS label rules
    #[error("'{input}' has an invalid label '{label}'")]
    InvalidLabel { input: String, label: String },

    /// Missing or malformed top-level domain
    #[error("'{input}' has no valid top-level domain")]
    MissingTld { input: String },
}

/// Failures of a single batch request against the favicon endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, TLS or body transfer failures
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Request exceeded the configured timeout
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Endpoint answered with a non-success status
    #[error("HTTP error: {status} - {url}")]
    Status { status: u16, url: String },

    /// Body was empty or not a recognisable image
    #[error("Malformed response body: {reason}")]
    MalformedBody { reason: String },

    /// Body exceeded the configured size cap
    #[error("Response too large: {size} bytes (max: {max_size})")]
    BodyTooLarge { size: u64, max_size: u64 },

    /// A single domain produces a URL the endpoint cannot accept
    #[error("Request URL too long: {length} characters (max: {max_length})")]
    UrlTooLong { length: usize, max_length: usize },

    /// The run was cancelled while the request was in flight
    #[error("Request cancelled")]
    Cancelled,
}

/// Failures turning a composite image into per-domain fragments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Bytes could not be decoded as an image
    #[error("Unreadable composite image: {message}")]
    Unreadable { message: String },

    /// Decoded image has no pixels
    #[error("Composite image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Image dimensions cannot be cut into the expected slot count
    #[error("Composite image {width}x{height} cannot be split into {slots} equal slots")]
    SlotMismatch { width: u32, height: u32, slots: usize },

    /// Split requested for zero domains
    #[error("No domains supplied for composite image")]
    NoDomains,
}

/// A cache entry that failed its sanity check
///
/// Never propagated as fatal: the cache logs it and reports a miss.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Inconsistent cache entry for {domain}: {reason}")]
pub struct CacheInconsistency {
    pub domain: String,
    pub reason: String,
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for AppError {
    fn from(error: figment::Error) -> Self {
        Self::Figment(Box::new(error))
    }
}

impl FetchError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. }
            | FetchError::Timeout { .. }
            | FetchError::Status { .. }
            | FetchError::MalformedBody { .. } => true,
            FetchError::BodyTooLarge { .. }
            | FetchError::UrlTooLong { .. }
            | FetchError::Cancelled => false,
        }
    }

    /// Map a reqwest failure, keeping timeouts distinguishable
    pub fn from_reqwest(error: reqwest::Error, url: &str) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                message: error.to_string(),
            }
        }
    }
}
