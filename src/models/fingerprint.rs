use std::fmt;

/// Label shown for blank or placeholder icons
pub const BLANK_LABEL: &str = "NULL";

/// Label shown for domains whose batch could not be fetched or decoded
pub const FETCH_FAILED_LABEL: &str = "FETCH_FAILED";

/// Length of a full SHA-256 hex digest
pub const DIGEST_HEX_LENGTH: usize = 64;

/// Per-domain result of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fingerprint {
    /// No distinguishing icon data (empty slot or known placeholder)
    Blank,
    /// Full lowercase SHA-256 hex of the icon's canonical pixels
    Digest(String),
    /// Batch request or decode failed after retries
    FetchFailed,
}

impl Fingerprint {
    pub fn is_blank(&self) -> bool {
        matches!(self, Fingerprint::Blank)
    }

    pub fn digest(&self) -> Option<&str> {
        match self {
            Fingerprint::Digest(hex) => Some(hex),
            _ => None,
        }
    }

    /// Report label: digest truncated to `display_length`, or a sentinel
    pub fn display_label(&self, display_length: usize) -> String {
        match self {
            Fingerprint::Blank => BLANK_LABEL.to_string(),
            Fingerprint::FetchFailed => FETCH_FAILED_LABEL.to_string(),
            Fingerprint::Digest(hex) => hex.chars().take(display_length).collect(),
        }
    }

    /// Whether this value may be stored in and served from the cache
    pub fn check_cacheable(&self) -> Result<(), String> {
        match self {
            Fingerprint::Blank => Ok(()),
            Fingerprint::FetchFailed => Err("fetch failures are never cached".to_string()),
            Fingerprint::Digest(hex) => {
                if hex.len() != DIGEST_HEX_LENGTH {
                    return Err(format!(
                        "digest has {} characters, expected {DIGEST_HEX_LENGTH}",
                        hex.len()
                    ));
                }
                if !hex
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
                {
                    return Err("digest is not lowercase hex".to_string());
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Blank => f.write_str(BLANK_LABEL),
            Fingerprint::FetchFailed => f.write_str(FETCH_FAILED_LABEL),
            Fingerprint::Digest(hex) => f.write_str(hex),
        }
    }
}
