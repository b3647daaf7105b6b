//! TTL cache of per-domain fingerprints
//!
//! Scoped to one process run and passed explicitly to the runner, so tests
//! can inject a fresh or pre-populated cache.

pub mod entry;
pub mod service;

pub use entry::CacheEntry;
pub use service::FingerprintCache;
