//! In-memory fingerprint cache with lazy TTL expiry

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::entry::CacheEntry;
use crate::errors::CacheInconsistency;
use crate::models::{Domain, Fingerprint};

/// Domain → fingerprint cache shared by all workers of a run
///
/// Expired entries are never purged on lookup; they read as misses and are
/// overwritten by the next `put`. Workers never race on a key because the
/// runner hands each domain to exactly one batch.
pub struct FingerprintCache {
    entries: RwLock<HashMap<Domain, CacheEntry>>,
    ttl: chrono::Duration,
}

impl FingerprintCache {
    /// Create an empty cache whose entries live for `ttl`
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.is_expired(now, self.ttl)
    }

    /// Look up a live, consistent fingerprint for `domain`
    pub async fn get(&self, domain: &Domain, now: DateTime<Utc>) -> Option<Fingerprint> {
        let entries = self.entries.read().await;
        self.lookup(&entries, domain, now)
    }

    /// Look up several domains under one read lock
    ///
    /// Returns only the hits; the result reflects a single point in time.
    pub async fn get_many(
        &self,
        domains: &[Domain],
        now: DateTime<Utc>,
    ) -> HashMap<Domain, Fingerprint> {
        let entries = self.entries.read().await;
        domains
            .iter()
            .filter_map(|domain| {
                self.lookup(&entries, domain, now)
                    .map(|fingerprint| (domain.clone(), fingerprint))
            })
            .collect()
    }

    /// Store a freshly computed fingerprint, superseding any previous entry
    ///
    /// Returns false when the value is not cacheable (fetch failures).
    pub async fn put(&self, domain: Domain, fingerprint: Fingerprint, now: DateTime<Utc>) -> bool {
        if let Err(reason) = fingerprint.check_cacheable() {
            debug!("Not caching {} for {}: {}", fingerprint, domain, reason);
            return false;
        }
        trace!("Caching {} for {}", fingerprint, domain);
        self.entries
            .write()
            .await
            .insert(domain, CacheEntry::new(fingerprint, now));
        true
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn lookup(
        &self,
        entries: &HashMap<Domain, CacheEntry>,
        domain: &Domain,
        now: DateTime<Utc>,
    ) -> Option<Fingerprint> {
        let entry = entries.get(domain)?;

        if self.is_expired(entry, now) {
            trace!("Cache entry for {} expired (age {})", domain, entry.age(now));
            return None;
        }

        if let Err(reason) = entry.fingerprint.check_cacheable() {
            let inconsistency = CacheInconsistency {
                domain: domain.to_string(),
                reason,
            };
            warn!("{}; treating as a miss", inconsistency);
            return None;
        }

        Some(entry.fingerprint.clone())
    }

    /// Insert an entry without validation, for exercising the sanity check
    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, domain: Domain, entry: CacheEntry) {
        self.entries.write().await.insert(domain, entry);
    }
}
