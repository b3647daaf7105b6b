//! Drives a full run: batch, fetch, split, fingerprint, aggregate
//!
//! A fixed set of worker tasks pulls batches from a shared queue and sends
//! each batch's outcome back on a channel. A worker owns a batch from fetch
//! to cache write, so a batch's results are either all recorded or, on
//! cancellation before the request completes, not at all. Decoding and
//! hashing run on the blocking pool.

use chrono::Utc;
use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::aggregator::{AnalysisReport, Aggregator};
use super::batcher::Batcher;
use super::fetcher::{BatchFetcher, FreshFetch};
use super::fingerprinter::Fingerprinter;
use super::splitter::{CompositeImage, ImageSplitter};
use crate::config::Config;
use crate::errors::{AppResult, DecodeError, DecodeResult, FetchError};
use crate::models::{Batch, Domain, DomainResult, Fingerprint};
use crate::services::{FaviconEndpoint, FingerprintCache, HttpFaviconEndpoint};

type BatchQueue = Arc<Mutex<VecDeque<Batch>>>;

/// What one worker produced for one batch
#[derive(Debug, Default)]
struct BatchOutcome {
    results: Vec<DomainResult>,
    cancelled: Vec<Domain>,
    cache_hits: usize,
    fresh: usize,
}

/// Per-batch stages shared by all workers
struct Stages {
    fetcher: BatchFetcher,
    splitter: ImageSplitter,
    fingerprinter: Fingerprinter,
    cache: Arc<FingerprintCache>,
}

/// Runs favicon analysis over a domain list
pub struct FaviconAnalyzer {
    batcher: Batcher,
    stages: Arc<Stages>,
    threads: usize,
    run_timeout: Option<Duration>,
}

impl FaviconAnalyzer {
    /// Assemble an analyzer around an existing endpoint and cache
    pub fn new(
        config: &Config,
        endpoint: Arc<dyn FaviconEndpoint>,
        cache: Arc<FingerprintCache>,
    ) -> Self {
        let batcher = Batcher::from_config(config);
        let fetcher = BatchFetcher::new(
            endpoint,
            batcher.url_builder().clone(),
            config.fetch.retry_config(),
            batcher.max_url_length(),
        );

        Self {
            batcher,
            stages: Arc::new(Stages {
                fetcher,
                splitter: ImageSplitter::new(config.fingerprint.layout),
                fingerprinter: Fingerprinter::new(&config.fingerprint),
                cache,
            }),
            threads: config.fetch.threads.max(1),
            run_timeout: config.run.timeout,
        }
    }

    /// Analyzer backed by the HTTP endpoint and a fresh cache
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let endpoint = HttpFaviconEndpoint::new(&config.endpoint)?;
        let cache = FingerprintCache::new(config.cache.ttl);
        Ok(Self::new(config, Arc::new(endpoint), Arc::new(cache)))
    }

    pub fn cache(&self) -> &Arc<FingerprintCache> {
        &self.stages.cache
    }

    /// Total endpoint calls made by this analyzer, across runs
    pub fn request_count(&self) -> usize {
        self.stages.fetcher.request_count()
    }

    /// Analyze `domains` and group them by favicon fingerprint
    ///
    /// Duplicates are collapsed to their first occurrence. Cancelling `cancel`
    /// (or hitting the configured run timeout) stops new work; domains whose
    /// batch had not completed land in the report's `cancelled` set.
    pub async fn analyze(&self, domains: Vec<Domain>, cancel: CancellationToken) -> AnalysisReport {
        let domains = dedup(domains);
        let mut aggregator = Aggregator::new();
        if domains.is_empty() {
            info!("No domains to analyze");
            return aggregator.finish();
        }

        let total = domains.len();
        let batches = self.batcher.partition(domains);
        let batch_count = batches.len();
        let workers = self.threads.min(batch_count);
        info!(
            "Analyzing {} domains in {} batches with {} workers",
            total, batch_count, workers
        );

        let requests_before = self.request_count();
        let run_cancel = cancel.child_token();
        let queue: BatchQueue = Arc::new(Mutex::new(VecDeque::from(batches)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    self.stages.clone(),
                    queue.clone(),
                    run_cancel.clone(),
                    tx.clone(),
                ))
            })
            .collect();
        drop(tx);

        let timer = self.run_timeout.map(|timeout| {
            let token = run_cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!("Run timeout of {:?} reached, cancelling remaining batches", timeout);
                token.cancel();
            })
        });

        while let Some(outcome) = rx.recv().await {
            let stats = aggregator.stats_mut();
            stats.cache_hits += outcome.cache_hits;
            stats.fresh_fingerprints += outcome.fresh;
            for result in outcome.results {
                aggregator.add(result);
            }
            for domain in outcome.cancelled {
                aggregator.add_cancelled(domain);
            }
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }
        if let Some(timer) = timer {
            timer.abort();
        }

        let leftover = std::mem::take(&mut *queue.lock().await);
        for batch in leftover {
            for domain in batch.domains {
                aggregator.add_cancelled(domain);
            }
        }

        let stats = aggregator.stats_mut();
        stats.batches = batch_count;
        stats.network_requests = self.request_count() - requests_before;

        let report = aggregator.finish();
        info!(
            "Run finished: {} groups, {} failed, {} cancelled, {} requests, {} cache hits",
            report.groups.len(),
            report.failed.len(),
            report.cancelled.len(),
            report.stats.network_requests,
            report.stats.cache_hits
        );
        report
    }
}

/// Pull batches until the queue is empty or the run is cancelled
async fn run_worker(
    id: usize,
    stages: Arc<Stages>,
    queue: BatchQueue,
    cancel: CancellationToken,
    results: mpsc::UnboundedSender<BatchOutcome>,
) {
    loop {
        if cancel.is_cancelled() {
            debug!("Worker {} stopping: run cancelled", id);
            break;
        }
        let Some(batch) = queue.lock().await.pop_front() else {
            break;
        };
        let outcome = stages.process(batch, &cancel).await;
        if results.send(outcome).is_err() {
            break;
        }
    }
}

impl Stages {
    async fn process(&self, batch: Batch, cancel: &CancellationToken) -> BatchOutcome {
        let fetch = self.fetcher.fetch(batch, &self.cache, Utc::now(), cancel).await;
        let index = fetch.batch_index;
        let mut outcome = BatchOutcome {
            cache_hits: fetch.cached.len(),
            results: fetch.cached,
            ..BatchOutcome::default()
        };

        match fetch.fresh {
            FreshFetch::NotNeeded => {}
            FreshFetch::Failed {
                domains,
                error: FetchError::Cancelled,
            } => {
                debug!("Batch {} cancelled with {} domains pending", index, domains.len());
                outcome.cancelled = domains;
            }
            FreshFetch::Failed { domains, error } => {
                error!("Batch {} failed ({} domains): {}", index, domains.len(), error);
                outcome.results.extend(failed(domains));
            }
            FreshFetch::Composite { domains, image } => {
                match self.fingerprint_composite(image, domains.clone()).await {
                    Ok(results) => {
                        let now = Utc::now();
                        for result in &results {
                            self.cache
                                .put(result.domain.clone(), result.fingerprint.clone(), now)
                                .await;
                        }
                        outcome.fresh = results.len();
                        outcome.results.extend(results);
                    }
                    Err(e) => {
                        error!("Batch {} composite unusable: {}", index, e);
                        outcome.results.extend(failed(domains));
                    }
                }
            }
        }

        outcome
    }

    async fn fingerprint_composite(
        &self,
        image: CompositeImage,
        domains: Vec<Domain>,
    ) -> DecodeResult<Vec<DomainResult>> {
        let splitter = self.splitter;
        let fingerprinter = self.fingerprinter.clone();

        let task = tokio::task::spawn_blocking(move || -> DecodeResult<Vec<DomainResult>> {
            let fragments = splitter.split(image, &domains)?;
            Ok(fragments
                .into_iter()
                .map(|fragment| {
                    let fingerprint = fingerprinter.classify(&fragment);
                    DomainResult::new(fragment.domain, fingerprint)
                })
                .collect())
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(DecodeError::Unreadable {
                message: format!("fingerprint task failed: {e}"),
            }),
        }
    }
}

fn failed(domains: Vec<Domain>) -> impl Iterator<Item = DomainResult> {
    domains
        .into_iter()
        .map(|domain| DomainResult::new(domain, Fingerprint::FetchFailed))
}

/// Drop repeated domains, keeping first-occurrence order
fn dedup(domains: Vec<Domain>) -> Vec<Domain> {
    let mut seen = HashSet::with_capacity(domains.len());
    domains
        .into_iter()
        .filter(|domain| seen.insert(domain.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchResult;
    use async_trait::async_trait;
    use bytes::Bytes;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SLOT: u32 = 16;

    /// Renders one slot per domain; domains starting with "red" get a red
    /// square, everything else stays white
    struct PaintingEndpoint {
        calls: AtomicUsize,
        fail_containing: Option<&'static str>,
    }

    impl PaintingEndpoint {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_containing: None,
            })
        }

        fn failing_on(marker: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_containing: Some(marker),
            })
        }
    }

    #[async_trait]
    impl FaviconEndpoint for PaintingEndpoint {
        async fn fetch_composite(&self, url: &str) -> FetchResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(marker) = self.fail_containing {
                if url.contains(marker) {
                    return Err(FetchError::Status {
                        status: 500,
                        url: url.to_string(),
                    });
                }
            }

            let list = url.trim_start_matches("https://icons.test/");
            let names: Vec<&str> = list.split('/').collect();
            let mut image =
                RgbaImage::from_pixel(SLOT * names.len() as u32, SLOT, Rgba([255, 255, 255, 255]));
            for (i, name) in names.iter().enumerate() {
                if name.starts_with("red") {
                    for y in 4..12 {
                        for x in 4..12 {
                            image.put_pixel(i as u32 * SLOT + x, y, Rgba([200, 0, 0, 255]));
                        }
                    }
                }
            }
            let mut out = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
                .map_err(|e| FetchError::MalformedBody {
                    reason: e.to_string(),
                })?;
            Ok(Bytes::from(out))
        }
    }

    fn config(batch_size: usize) -> Config {
        let mut config = Config::default();
        config.endpoint.url = "https://icons.test/".to_string();
        config.batching.max_batch_size = batch_size;
        config.fetch.threads = 2;
        config.fetch.max_attempts = 2;
        config.fetch.initial_backoff = Duration::from_millis(1);
        config.fetch.max_backoff = Duration::from_millis(2);
        config.fetch.jitter = false;
        config
    }

    fn analyzer(config: &Config, endpoint: Arc<PaintingEndpoint>) -> FaviconAnalyzer {
        let cache = Arc::new(FingerprintCache::new(config.cache.ttl));
        FaviconAnalyzer::new(config, endpoint, cache)
    }

    fn d(name: &str) -> Domain {
        Domain::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_groups_blank_and_colored() {
        let endpoint = PaintingEndpoint::new();
        let analyzer = analyzer(&config(20), endpoint.clone());

        let report = analyzer
            .analyze(
                vec![d("a.com"), d("red.com"), d("c.com"), d("a.com")],
                CancellationToken::new(),
            )
            .await;

        assert_eq!(report.groups.len(), 2);
        let blank = report.group(&Fingerprint::Blank).unwrap();
        assert_eq!(blank.iter().map(Domain::as_str).collect::<Vec<_>>(), vec!["a.com", "c.com"]);
        assert_eq!(report.total_count(), 3);
        assert_eq!(report.stats.batches, 1);
        assert_eq!(report.stats.network_requests, 1);
        assert_eq!(report.stats.fresh_fingerprints, 3);
    }

    #[tokio::test]
    async fn test_identical_icons_share_group_across_batches() {
        let endpoint = PaintingEndpoint::new();
        let analyzer = analyzer(&config(1), endpoint.clone());

        let report = analyzer
            .analyze(
                vec![d("red1.com"), d("red2.com"), d("red3.com")],
                CancellationToken::new(),
            )
            .await;

        assert_eq!(report.groups.len(), 1);
        let (fingerprint, domains) = report.groups.iter().next().unwrap();
        assert!(fingerprint.digest().is_some());
        assert_eq!(domains.len(), 3);
        assert_eq!(report.stats.batches, 3);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_affect_others() {
        let endpoint = PaintingEndpoint::failing_on("bad.com");
        let analyzer = analyzer(&config(1), endpoint.clone());

        let report = analyzer
            .analyze(vec![d("a.com"), d("bad.com"), d("red.com")], CancellationToken::new())
            .await;

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed.contains(&d("bad.com")));
        assert_eq!(report.resolved_count(), 3);
        assert!(report.is_complete());
        assert!(analyzer.cache().get(&d("bad.com"), Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn test_second_run_served_from_cache() {
        let endpoint = PaintingEndpoint::new();
        let analyzer = analyzer(&config(2), endpoint.clone());
        let input = vec![d("a.com"), d("red.com"), d("c.com")];

        let first = analyzer.analyze(input.clone(), CancellationToken::new()).await;
        let calls = endpoint.calls.load(Ordering::SeqCst);
        let second = analyzer.analyze(input, CancellationToken::new()).await;

        assert_eq!(first.groups, second.groups);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), calls);
        assert_eq!(second.stats.network_requests, 0);
        assert_eq!(second.stats.cache_hits, 3);
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_pending_domains() {
        let endpoint = PaintingEndpoint::new();
        let analyzer = analyzer(&config(1), endpoint.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = analyzer.analyze(vec![d("a.com"), d("b.com")], cancel).await;

        assert_eq!(report.cancelled.len(), 2);
        assert_eq!(report.resolved_count(), 0);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let endpoint = PaintingEndpoint::new();
        let analyzer = analyzer(&config(20), endpoint.clone());
        let report = analyzer.analyze(Vec::new(), CancellationToken::new()).await;
        assert_eq!(report, AnalysisReport::default());
    }
}
