//! Fingerprint cache entry with lazy TTL evaluation

use chrono::{DateTime, Utc};

use crate::models::Fingerprint;

/// Stored fingerprint plus the moment it was computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(fingerprint: Fingerprint, stored_at: DateTime<Utc>) -> Self {
        Self {
            fingerprint,
            stored_at,
        }
    }

    /// Age of the entry at `now`; negative if the clock went backwards
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.stored_at
    }

    /// An entry is valid while `now - stored_at < ttl`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.age(now) >= ttl
    }
}
