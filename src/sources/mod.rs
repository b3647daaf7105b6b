//! Domain input sources
//!
//! Domains arrive either as a wordlist file or as a single command-line
//! argument. Both paths validate every entry and collect rejections instead
//! of failing the run.

pub mod wordlist;

pub use wordlist::{DomainList, Rejected, load_wordlist, parse_domain_argument, parse_wordlist};
