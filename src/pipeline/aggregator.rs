//! Group per-domain results by fingerprint

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::models::fingerprint::DIGEST_HEX_LENGTH;
use crate::models::{Domain, DomainResult, FETCH_FAILED_LABEL, Fingerprint};

/// Counters describing how a run resolved its domains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub batches: usize,
    pub network_requests: usize,
    pub cache_hits: usize,
    pub fresh_fingerprints: usize,
}

/// Everything a run learned, keyed by fingerprint
///
/// Every submitted domain appears exactly once: in a group, in `failed`, or
/// in `cancelled`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub groups: BTreeMap<Fingerprint, BTreeSet<Domain>>,
    pub failed: BTreeSet<Domain>,
    pub cancelled: BTreeSet<Domain>,
    pub stats: RunStats,
}

/// Rendering choices for [`AnalysisReport::summaries`]
#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub show_blank: bool,
    pub display_length: usize,
}

/// One output row: a display label with its domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    pub domains: Vec<String>,
}

impl AnalysisReport {
    /// Domains resolved to some outcome other than cancellation
    pub fn resolved_count(&self) -> usize {
        self.groups.values().map(BTreeSet::len).sum::<usize>() + self.failed.len()
    }

    pub fn total_count(&self) -> usize {
        self.resolved_count() + self.cancelled.len()
    }

    pub fn is_complete(&self) -> bool {
        self.cancelled.is_empty()
    }

    /// Domains sharing `fingerprint`, if any
    pub fn group(&self, fingerprint: &Fingerprint) -> Option<&BTreeSet<Domain>> {
        self.groups.get(fingerprint)
    }

    /// Output rows ordered by count (descending) then label
    ///
    /// The blank group is only included with `show_blank`; fetch failures are
    /// always reported. Digests whose truncated labels collide are shown in
    /// full, so every row label is unique.
    pub fn summaries(&self, options: SummaryOptions) -> Vec<GroupSummary> {
        let visible: Vec<_> = self
            .groups
            .iter()
            .filter(|(fingerprint, _)| options.show_blank || !fingerprint.is_blank())
            .collect();

        let mut label_counts: HashMap<String, usize> = HashMap::new();
        for (fingerprint, _) in &visible {
            *label_counts
                .entry(fingerprint.display_label(options.display_length))
                .or_default() += 1;
        }

        let mut rows: Vec<GroupSummary> = visible
            .into_iter()
            .map(|(fingerprint, domains)| {
                let short = fingerprint.display_label(options.display_length);
                let label = if label_counts.get(&short).copied().unwrap_or(0) > 1 {
                    fingerprint.display_label(DIGEST_HEX_LENGTH)
                } else {
                    short
                };
                GroupSummary {
                    label,
                    count: domains.len(),
                    domains: domains.iter().map(Domain::to_string).collect(),
                }
            })
            .collect();

        if !self.failed.is_empty() {
            rows.push(GroupSummary {
                label: FETCH_FAILED_LABEL.to_string(),
                count: self.failed.len(),
                domains: self.failed.iter().map(Domain::to_string).collect(),
            });
        }

        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        rows
    }
}

/// Incrementally builds an [`AnalysisReport`]
#[derive(Debug, Default)]
pub struct Aggregator {
    report: AnalysisReport,
    seen: HashSet<Domain>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one domain's outcome; later duplicates are ignored
    pub fn add(&mut self, result: DomainResult) {
        if !self.seen.insert(result.domain.clone()) {
            debug!("Ignoring duplicate result for {}", result.domain);
            return;
        }
        match result.fingerprint {
            Fingerprint::FetchFailed => {
                self.report.failed.insert(result.domain);
            }
            fingerprint => {
                self.report
                    .groups
                    .entry(fingerprint)
                    .or_default()
                    .insert(result.domain);
            }
        }
    }

    /// Record a domain the run never resolved
    pub fn add_cancelled(&mut self, domain: Domain) {
        if self.seen.insert(domain.clone()) {
            self.report.cancelled.insert(domain);
        }
    }

    pub fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.report.stats
    }

    pub fn finish(self) -> AnalysisReport {
        self.report
    }
}

/// Group a complete set of results in one go
pub fn aggregate(results: impl IntoIterator<Item = DomainResult>) -> AnalysisReport {
    let mut aggregator = Aggregator::new();
    for result in results {
        aggregator.add(result);
    }
    aggregator.finish()
}
