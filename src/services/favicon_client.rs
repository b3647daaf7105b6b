use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::errors::{AppResult, FetchError, FetchResult};

/// Source of composite favicon images
///
/// One call fetches one batch URL. Implementations report every failure as a
/// [`FetchError`]; retrying is the caller's job.
#[async_trait]
pub trait FaviconEndpoint: Send + Sync {
    /// Fetch the composite image for a fully built batch URL
    async fn fetch_composite(&self, url: &str) -> FetchResult<Bytes>;
}

/// reqwest-backed endpoint client
pub struct HttpFaviconEndpoint {
    client: Client,
    max_response_bytes: u64,
}

impl HttpFaviconEndpoint {
    /// Build a client with the configured timeouts and user agent
    pub fn new(config: &EndpointConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }
}

#[async_trait]
impl FaviconEndpoint for HttpFaviconEndpoint {
    async fn fetch_composite(&self, url: &str) -> FetchResult<Bytes> {
        debug!("Fetching composite favicon image: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_response_bytes {
                return Err(FetchError::BodyTooLarge {
                    size: length,
                    max_size: self.max_response_bytes,
                });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        check_composite_body(&bytes, self.max_response_bytes)?;

        debug!("Fetched composite image: {} ({} bytes)", url, bytes.len());
        Ok(bytes)
    }
}

/// Reject bodies that cannot possibly be a composite image
pub fn check_composite_body(bytes: &[u8], max_response_bytes: u64) -> FetchResult<()> {
    if bytes.len() as u64 > max_response_bytes {
        return Err(FetchError::BodyTooLarge {
            size: bytes.len() as u64,
            max_size: max_response_bytes,
        });
    }
    if bytes.is_empty() {
        return Err(FetchError::MalformedBody {
            reason: "empty body".to_string(),
        });
    }
    image::guess_format(bytes).map_err(|_| FetchError::MalformedBody {
        reason: "body is not a recognised image format".to_string(),
    })?;
    Ok(())
}
