pub mod favicon_client;
pub mod fingerprint_cache;

pub use favicon_client::{FaviconEndpoint, HttpFaviconEndpoint};
pub use fingerprint_cache::{CacheEntry, FingerprintCache};
