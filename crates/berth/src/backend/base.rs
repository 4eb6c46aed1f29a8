//! Helpers every backend shares: request validation, default naming,
//! port display order, and timestamp rendering.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

use crate::error::ValidationError;
use crate::model::{DeployConfig, PortBinding};

/// Characters used for generated name suffixes.
const NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const NAME_SUFFIX_LEN: usize = 6;

/// Reject a deploy request whose host ports are not pairwise distinct.
pub fn validate_config(config: &DeployConfig) -> Result<(), ValidationError> {
    match &config.ports {
        Some(ports) => validate_ports(ports),
        None => Ok(()),
    }
}

pub fn validate_ports(ports: &[PortBinding]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(ports.len());
    if ports.iter().all(|p| seen.insert(p.host_port)) {
        Ok(())
    } else {
        Err(ValidationError::new("Duplicate host ports detected"))
    }
}

/// `<prefix>-` followed by six random lowercase alphanumerics.
///
/// Collisions are left for the daemon to reject.
pub fn generate_name(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| NAME_ALPHABET[rng.random_range(0..NAME_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", prefix, suffix)
}

/// Stop grace period in the daemon's signed seconds, saturating at `i32::MAX`.
pub fn stop_timeout(secs: u64) -> i32 {
    i32::try_from(secs).unwrap_or(i32::MAX)
}

/// Deduplicate, then order by length and lexicographically within a length.
pub fn sort_ports(ports: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ports: Vec<String> = ports.into_iter().filter(|p| seen.insert(p.clone())).collect();
    ports.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    ports
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn iso_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a Unix timestamp in seconds; out-of-range values fall back to now.
pub fn iso_from_unix(secs: i64) -> String {
    iso_millis(DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
}

/// Re-render a daemon RFC3339 timestamp; missing or unparseable values
/// fall back to now.
pub fn iso_from_rfc3339(raw: Option<&str>) -> String {
    let parsed = raw
        .and_then(|r| DateTime::parse_from_rfc3339(r).ok())
        .map(|dt| dt.with_timezone(&Utc));
    iso_millis(parsed.unwrap_or_else(Utc::now))
}
