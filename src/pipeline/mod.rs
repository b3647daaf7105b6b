//! The analysis pipeline
//!
//! ```text
//! domains -> Batcher -> BatchFetcher (cache, retry) -> ImageSplitter
//!         -> Fingerprinter -> Aggregator -> AnalysisReport
//! ```
//!
//! [`FaviconAnalyzer`] wires the stages together and runs batches on a
//! bounded worker pool.

pub mod aggregator;
pub mod batcher;
pub mod fetcher;
pub mod fingerprinter;
pub mod runner;
pub mod splitter;

pub use aggregator::{AnalysisReport, Aggregator, GroupSummary, RunStats, SummaryOptions, aggregate};
pub use batcher::{BatchUrlBuilder, Batcher};
pub use fetcher::{BatchFetch, BatchFetcher, FreshFetch};
pub use fingerprinter::Fingerprinter;
pub use runner::FaviconAnalyzer;
pub use splitter::{CompositeImage, IconFragment, ImageSplitter};
