use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::errors::{AppError, AppResult};
use crate::utils::retry::RetryConfig;
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub batching: BatchingConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub fingerprint: FingerprintConfig,
    pub run: RunConfig,
}

/// Batch favicon endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Prefix the ordered domain list is appended to
    pub url: String,
    /// Token placed between consecutive domains
    pub separator: String,
    /// Fixed text appended after the domain list (e.g. "?size=16")
    pub suffix: String,
    #[serde(with = "duration_serde::duration")]
    pub request_timeout: Duration,
    #[serde(with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    pub max_response_bytes: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    pub max_batch_size: usize,
    pub max_url_length: usize,
    /// Conservative allowance per domain for the separator and encoding slack
    pub per_domain_overhead: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of workers pulling batches concurrently
    pub threads: usize,
    /// Total attempts per batch request, including the first
    pub max_attempts: u32,
    #[serde(with = "duration_serde::duration")]
    pub initial_backoff: Duration,
    #[serde(with = "duration_serde::duration")]
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(with = "duration_serde::duration")]
    pub ttl: Duration,
}

/// How icon slots are laid out inside a composite image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotLayout {
    /// Slots side by side, sliced by width
    Horizontal,
    /// Slots stacked top to bottom, sliced by height
    Vertical,
    /// Pick the axis from the image geometry
    #[default]
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Hex characters of the digest shown in reports
    pub display_length: usize,
    /// Pixels ignored at each edge when looking for icon content
    pub blank_border_px: u32,
    /// Minimum value of every RGB channel for a pixel to count as white
    pub white_floor: u8,
    /// Maximum alpha for a pixel to count as transparent
    pub alpha_ceiling: u8,
    /// Digest prefixes of known placeholder icons, reported as blank
    pub placeholder_prefixes: Vec<String>,
    pub layout: SlotLayout,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cancel the run after this long, keeping completed batches
    #[serde(
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_string(),
            separator: DEFAULT_DOMAIN_SEPARATOR.to_string(),
            suffix: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_url_length: DEFAULT_MAX_URL_LENGTH,
            per_domain_overhead: DEFAULT_PER_DOMAIN_OVERHEAD,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: DEFAULT_RETRY_JITTER,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            display_length: DEFAULT_DISPLAY_LENGTH,
            blank_border_px: DEFAULT_BLANK_BORDER_PX,
            white_floor: DEFAULT_WHITE_FLOOR,
            alpha_ceiling: DEFAULT_ALPHA_CEILING,
            placeholder_prefixes: vec![DEFAULT_PLACEHOLDER_PREFIX.to_string()],
            layout: SlotLayout::Auto,
        }
    }
}

impl FetchConfig {
    /// Retry policy for batch requests
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_backoff,
            max_delay: self.max_backoff,
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `FAVICON_RECON_*` environment variables
    ///
    /// Nested keys use a double underscore, e.g. `FAVICON_RECON_FETCH__THREADS=4`.
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(AppError::configuration(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            info!("Loading configuration from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from an assembled figment
    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> AppResult<()> {
        let endpoint = url::Url::parse(&self.endpoint.url).map_err(|e| {
            AppError::configuration(format!("endpoint.url '{}' is invalid: {e}", self.endpoint.url))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AppError::configuration(format!(
                "endpoint.url must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }
        if self.endpoint.separator.is_empty() {
            return Err(AppError::configuration("endpoint.separator must not be empty"));
        }
        if self.batching.max_batch_size == 0 {
            return Err(AppError::configuration("batching.max_batch_size must be at least 1"));
        }
        if self.batching.per_domain_overhead < self.endpoint.separator.len() {
            return Err(AppError::configuration(format!(
                "batching.per_domain_overhead must be at least the separator length ({})",
                self.endpoint.separator.len()
            )));
        }
        let fixed_length = self.endpoint.url.len() + self.endpoint.suffix.len();
        if self.batching.max_url_length <= fixed_length {
            return Err(AppError::configuration(format!(
                "batching.max_url_length ({}) leaves no room after the endpoint ({fixed_length} characters)",
                self.batching.max_url_length
            )));
        }
        if self.fetch.threads == 0 {
            return Err(AppError::configuration("fetch.threads must be at least 1"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(AppError::configuration("fetch.max_attempts must be at least 1"));
        }
        if !(self.fetch.backoff_multiplier >= 1.0) {
            return Err(AppError::configuration("fetch.backoff_multiplier must be >= 1.0"));
        }
        if self.cache.ttl.is_zero() {
            return Err(AppError::configuration("cache.ttl must be greater than zero"));
        }
        if !(1..=64).contains(&self.fingerprint.display_length) {
            return Err(AppError::configuration(
                "fingerprint.display_length must be between 1 and 64",
            ));
        }
        for prefix in &self.fingerprint.placeholder_prefixes {
            let is_hex = prefix
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
            if prefix.is_empty() || prefix.len() > 64 || !is_hex {
                return Err(AppError::configuration(format!(
                    "fingerprint.placeholder_prefixes entry '{prefix}' must be 1-64 lowercase hex characters"
                )));
            }
        }
        Ok(())
    }
}
