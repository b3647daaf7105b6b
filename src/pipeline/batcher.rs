//! Partition domains into URL-length-bounded batches

use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Batch, Domain};

/// Builds batch request URLs and estimates their length
///
/// The estimate charges `per_domain_overhead` for every domain instead of
/// the exact separator count, so it never under-estimates the real URL as
/// long as the overhead covers one separator.
#[derive(Debug, Clone)]
pub struct BatchUrlBuilder {
    prefix: String,
    separator: String,
    suffix: String,
    per_domain_overhead: usize,
}

impl BatchUrlBuilder {
    pub fn new(
        prefix: impl Into<String>,
        separator: impl Into<String>,
        suffix: impl Into<String>,
        per_domain_overhead: usize,
    ) -> Self {
        let separator = separator.into();
        Self {
            per_domain_overhead: per_domain_overhead.max(separator.len()),
            prefix: prefix.into(),
            separator,
            suffix: suffix.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.endpoint.url.clone(),
            config.endpoint.separator.clone(),
            config.endpoint.suffix.clone(),
            config.batching.per_domain_overhead,
        )
    }

    /// Length of the endpoint prefix and suffix
    pub fn fixed_length(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }

    /// Estimated cost of adding one domain
    pub fn domain_cost(&self, domain: &Domain) -> usize {
        domain.len() + self.per_domain_overhead
    }

    pub fn estimate(&self, domains: &[Domain]) -> usize {
        self.fixed_length()
            + domains
                .iter()
                .map(|domain| self.domain_cost(domain))
                .sum::<usize>()
    }

    /// Request URL carrying `domains` in order
    pub fn build(&self, domains: &[Domain]) -> String {
        let mut url = String::with_capacity(self.estimate(domains));
        url.push_str(&self.prefix);
        for (i, domain) in domains.iter().enumerate() {
            if i > 0 {
                url.push_str(&self.separator);
            }
            url.push_str(domain.as_str());
        }
        url.push_str(&self.suffix);
        url
    }
}

/// Greedy, order-preserving batch partitioner
#[derive(Debug, Clone)]
pub struct Batcher {
    urls: BatchUrlBuilder,
    max_batch_size: usize,
    max_url_length: usize,
}

impl Batcher {
    pub fn new(urls: BatchUrlBuilder, max_batch_size: usize, max_url_length: usize) -> Self {
        Self {
            urls,
            max_batch_size: max_batch_size.max(1),
            max_url_length,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            BatchUrlBuilder::from_config(config),
            config.batching.max_batch_size,
            config.batching.max_url_length,
        )
    }

    pub fn url_builder(&self) -> &BatchUrlBuilder {
        &self.urls
    }

    pub fn max_url_length(&self) -> usize {
        self.max_url_length
    }

    /// Split `domains` into batches, preserving input order
    ///
    /// A batch closes when adding the next domain would exceed either the
    /// domain count or the estimated URL length. A domain too long to fit
    /// even alone gets its own batch flagged `oversized`.
    pub fn partition(&self, domains: Vec<Domain>) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current: Vec<Domain> = Vec::new();
        let mut current_length = self.urls.fixed_length();

        for domain in domains {
            let cost = self.urls.domain_cost(&domain);

            let full = current.len() >= self.max_batch_size
                || current_length + cost > self.max_url_length;
            if !current.is_empty() && full {
                self.close(&mut batches, std::mem::take(&mut current), false);
                current_length = self.urls.fixed_length();
            }

            current_length += cost;
            current.push(domain);

            if current.len() == 1 && current_length > self.max_url_length {
                warn!(
                    "Domain {} needs an estimated {} character URL (max {}), isolating it",
                    current[0], current_length, self.max_url_length
                );
                self.close(&mut batches, std::mem::take(&mut current), true);
                current_length = self.urls.fixed_length();
            }
        }

        if !current.is_empty() {
            self.close(&mut batches, current, false);
        }

        debug!("Partitioned domains into {} batches", batches.len());
        batches
    }

    fn close(&self, batches: &mut Vec<Batch>, domains: Vec<Domain>, oversized: bool) {
        batches.push(Batch {
            index: batches.len(),
            domains,
            oversized,
        });
    }
}
