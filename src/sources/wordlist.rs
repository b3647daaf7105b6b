use std::path::Path;
use tracing::{debug, warn};

use crate::errors::{AppResult, ValidationError};
use crate::models::Domain;

/// An input entry that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// 1-based line (wordlist) or item position (argument)
    pub position: usize,
    pub input: String,
    pub error: ValidationError,
}

/// Validated domains in input order, plus what was rejected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainList {
    pub domains: Vec<Domain>,
    pub rejected: Vec<Rejected>,
}

impl DomainList {
    fn push(&mut self, position: usize, input: &str) {
        match Domain::parse(input) {
            Ok(domain) => self.domains.push(domain),
            Err(error) => self.rejected.push(Rejected {
                position,
                input: input.to_string(),
                error,
            }),
        }
    }

    fn log_rejected(&self, source: &str) {
        for rejected in &self.rejected {
            warn!(
                "Skipping {} entry {} ('{}'): {}",
                source, rejected.position, rejected.input, rejected.error
            );
        }
    }
}

/// Parse wordlist content: one domain per line
///
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_wordlist(content: &str) -> DomainList {
    let mut list = DomainList::default();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        list.push(i + 1, line);
    }
    list
}

/// Read and parse a wordlist file, logging rejected lines
pub async fn load_wordlist(path: &Path) -> AppResult<DomainList> {
    let content = tokio::fs::read_to_string(path).await?;
    let list = parse_wordlist(&content);
    debug!(
        "Loaded {} domains from {} ({} rejected)",
        list.domains.len(),
        path.display(),
        list.rejected.len()
    );
    list.log_rejected("wordlist");
    Ok(list)
}

/// Parse the `--url` argument
///
/// Items are separated by commas or whitespace. An item carrying a scheme is
/// a single URL; any other item may chain several domains with `/`.
pub fn parse_domain_argument(arg: &str) -> DomainList {
    let mut list = DomainList::default();
    let mut position = 0;
    for item in arg
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
    {
        if item.contains("://") {
            position += 1;
            list.push(position, item);
            continue;
        }
        for part in item.split('/').filter(|part| !part.is_empty()) {
            position += 1;
            list.push(position, part);
        }
    }
    list.log_rejected("argument");
    list
}
