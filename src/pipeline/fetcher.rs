//! Cache-aware batch fetching with retries

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::batcher::BatchUrlBuilder;
use super::splitter::CompositeImage;
use crate::errors::FetchError;
use crate::models::{Batch, Domain, DomainResult};
use crate::services::{FaviconEndpoint, FingerprintCache};
use crate::utils::retry::{RetryConfig, with_retry};

/// What still needs to happen for the domains the cache could not answer
#[derive(Debug)]
pub enum FreshFetch {
    /// Every domain was served from cache
    NotNeeded,
    /// Composite image for `domains`, slot order matching domain order
    Composite {
        domains: Vec<Domain>,
        image: CompositeImage,
    },
    /// Request could not be completed for `domains`
    Failed {
        domains: Vec<Domain>,
        error: FetchError,
    },
}

/// Result of fetching one batch
#[derive(Debug)]
pub struct BatchFetch {
    pub batch_index: usize,
    /// Domains answered from cache, in batch order
    pub cached: Vec<DomainResult>,
    pub fresh: FreshFetch,
}

/// Issues batch requests for domains the cache cannot answer
pub struct BatchFetcher {
    endpoint: Arc<dyn FaviconEndpoint>,
    urls: BatchUrlBuilder,
    retry: RetryConfig,
    max_url_length: usize,
    requests: AtomicUsize,
}

impl BatchFetcher {
    pub fn new(
        endpoint: Arc<dyn FaviconEndpoint>,
        urls: BatchUrlBuilder,
        retry: RetryConfig,
        max_url_length: usize,
    ) -> Self {
        Self {
            endpoint,
            urls,
            retry,
            max_url_length,
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of endpoint calls issued so far, retries included
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Serve what the cache can, then fetch the rest in one request
    pub async fn fetch(
        &self,
        batch: Batch,
        cache: &FingerprintCache,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> BatchFetch {
        let Batch {
            index,
            domains,
            oversized,
        } = batch;

        let mut hits = cache.get_many(&domains, now).await;
        let mut cached = Vec::with_capacity(hits.len());
        let mut remaining = Vec::with_capacity(domains.len() - hits.len());
        for domain in domains {
            match hits.remove(&domain) {
                Some(fingerprint) => cached.push(DomainResult::new(domain, fingerprint)),
                None => remaining.push(domain),
            }
        }

        if remaining.is_empty() {
            debug!("Batch {} fully served from cache ({} domains)", index, cached.len());
            return BatchFetch {
                batch_index: index,
                cached,
                fresh: FreshFetch::NotNeeded,
            };
        }

        let url = self.urls.build(&remaining);

        if oversized {
            return BatchFetch {
                batch_index: index,
                cached,
                fresh: FreshFetch::Failed {
                    error: FetchError::UrlTooLong {
                        length: url.len(),
                        max_length: self.max_url_length,
                    },
                    domains: remaining,
                },
            };
        }

        debug!(
            "Batch {}: {} cached, fetching {} domains",
            index,
            cached.len(),
            remaining.len()
        );

        let endpoint = self.endpoint.clone();
        let requests = &self.requests;
        let result = with_retry(
            &self.retry,
            cancel,
            || {
                let endpoint = endpoint.clone();
                let url = url.clone();
                requests.fetch_add(1, Ordering::Relaxed);
                async move { endpoint.fetch_composite(&url).await }
            },
            &format!("fetch batch {index}"),
        )
        .await;

        let fresh = match result {
            Ok(bytes) => FreshFetch::Composite {
                domains: remaining,
                image: CompositeImage::new(bytes),
            },
            Err(error) => FreshFetch::Failed {
                domains: remaining,
                error,
            },
        };

        BatchFetch {
            batch_index: index,
            cached,
            fresh,
        }
    }
}
