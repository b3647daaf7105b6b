pub mod domain;
pub mod fingerprint;

pub use domain::Domain;
pub use fingerprint::{BLANK_LABEL, FETCH_FAILED_LABEL, Fingerprint};

/// An ordered group of domains submitted in one endpoint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position in the run's batch sequence
    pub index: usize,
    pub domains: Vec<Domain>,
    /// A lone domain whose request URL alone exceeds the length bound
    pub oversized: bool,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Final outcome for one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainResult {
    pub domain: Domain,
    pub fingerprint: Fingerprint,
}

impl DomainResult {
    pub fn new(domain: Domain, fingerprint: Fingerprint) -> Self {
        Self {
            domain,
            fingerprint,
        }
    }
}
