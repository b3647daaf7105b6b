//! Favicon reconnaissance: group domains by the icon they serve
//!
//! Domains are submitted in batches to a composite favicon endpoint. Each
//! returned image is cut into per-domain slots, every slot is fingerprinted,
//! and domains sharing a fingerprint are grouped. Shared icons point at
//! shared hosting, parking pages or a common operator.

pub mod config;
pub mod errors;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod services;
pub mod sources;
pub mod utils;

pub use config::Config;
pub use errors::{AppError, AppResult};
pub use models::{Domain, Fingerprint};
pub use pipeline::{AnalysisReport, FaviconAnalyzer};
