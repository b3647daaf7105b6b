//! Hostname validation
//!
//! Accepts what people paste into wordlists (bare hosts, full URLs, mixed
//! case, trailing dots) and reduces it to a lowercase ASCII hostname, or
//! rejects it with a [`ValidationError`].

use url::{Host, Url};

use crate::errors::ValidationError;

/// Maximum length of a full hostname
pub const MAX_HOSTNAME_LENGTH: usize = 253;

/// Maximum length of a single DNS label
pub const MAX_LABEL_LENGTH: usize = 63;

/// Normalise user input into a lowercase ASCII hostname
///
/// Scheme, credentials, port, path and query are discarded. Internationalised
/// names come back in punycode.
pub fn normalize_hostname(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| ValidationError::InvalidHost {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let host = match parsed.host() {
        Some(Host::Domain(domain)) => domain.trim_end_matches('.').to_ascii_lowercase(),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
            return Err(ValidationError::IpAddress {
                input: trimmed.to_string(),
            });
        }
        None => {
            return Err(ValidationError::InvalidHost {
                input: trimmed.to_string(),
                reason: "no host component".to_string(),
            });
        }
    };

    validate_hostname(&host).map_err(|err| match err {
        // Report against what the user typed, not the normalised form
        ValidationError::TooLong { max, .. } => ValidationError::TooLong {
            input: trimmed.to_string(),
            max,
        },
        ValidationError::InvalidLabel { label, .. } => ValidationError::InvalidLabel {
            input: trimmed.to_string(),
            label,
        },
        ValidationError::MissingTld { .. } => ValidationError::MissingTld {
            input: trimmed.to_string(),
        },
        other => other,
    })?;

    Ok(host)
}

/// Check an already-lowercased hostname against DNS label rules and the
/// public suffix list
pub fn validate_hostname(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::Empty);
    }
    if host.len() > MAX_HOSTNAME_LENGTH {
        return Err(ValidationError::TooLong {
            input: host.to_string(),
            max: MAX_HOSTNAME_LENGTH,
        });
    }

    let labels: Vec<&str> = host.split('.').collect();
    for label in &labels {
        if !is_valid_label(label) {
            return Err(ValidationError::InvalidLabel {
                input: host.to_string(),
                label: label.to_string(),
            });
        }
    }

    // Needs a registrable name under a suffix on the public suffix list
    let registrable = psl::domain(host.as_bytes()).is_some_and(|domain| domain.suffix().is_known());
    if labels.len() < 2 || !registrable {
        return Err(ValidationError::MissingTld {
            input: host.to_string(),
        });
    }

    Ok(())
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LENGTH
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
