//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.
use std::time::Duration;

// Endpoint defaults
pub const DEFAULT_ENDPOINT_URL: &str = "https://favicon.yandex.net/favicon/";
pub const DEFAULT_DOMAIN_SEPARATOR: &str = "/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 5_000_000; // 5MB
pub const DEFAULT_USER_AGENT: &str = concat!("favicon-recon/", env!("CARGO_PKG_VERSION"));

// Batching defaults
pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_MAX_URL_LENGTH: usize = 2200;
pub const DEFAULT_PER_DOMAIN_OVERHEAD: usize = 3;

// Fetch defaults
pub const DEFAULT_THREADS: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_RETRY_JITTER: bool = true;

// Cache defaults
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// Fingerprint defaults
pub const DEFAULT_DISPLAY_LENGTH: usize = 8;
pub const DEFAULT_BLANK_BORDER_PX: u32 = 1;
pub const DEFAULT_WHITE_FLOOR: u8 = 245;
pub const DEFAULT_ALPHA_CEILING: u8 = 8;
/// Digest prefix of the endpoint's generic "no icon" placeholder
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "5f70bf18";

// Environment
pub const ENV_PREFIX: &str = "FAVICON_RECON_";
