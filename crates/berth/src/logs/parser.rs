//! Tiered parsing of raw daemon log text into [`LogEntry`] records.
//!
//! Daemon output is not uniform. Most lines arrive as
//! `<rfc3339> <stream> <message>`, but lines that lost their frame header
//! keep a leading control byte and an embedded timestamp, and anything else
//! is free text. Each line is offered to an ordered chain of matchers and the
//! first one that claims it decides the outcome.

use chrono::Utc;
use regex::Regex;
use thiserror::Error;

use crate::model::{LogEntry, LogStream};

/// Per-line parse failure. Logged and skipped, never fatal to a batch.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("pattern matched without capture group {0}")]
    MissingGroup(usize),
    #[error("invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// What a matcher decided for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Entry(LogEntry),
    /// The matcher owns the line but nothing usable came out of it.
    Discard,
}

/// One tier of the chain. `Ok(None)` passes the line to the next tier.
pub trait LineMatcher: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_parse(&self, line: &str) -> Result<Option<Outcome>, LineError>;
}

// ── Tier 1: `<timestamp> <stream> <message>` ────────────────────

pub struct TaggedLine {
    pattern: Regex,
}

impl TaggedLine {
    pub fn new() -> Result<Self, LineError> {
        Ok(Self {
            pattern: Regex::new(
                r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+Z)\s(stdout|stderr)\s(.+)",
            )?,
        })
    }
}

impl LineMatcher for TaggedLine {
    fn name(&self) -> &'static str {
        "tagged"
    }

    fn try_parse(&self, line: &str) -> Result<Option<Outcome>, LineError> {
        let Some(caps) = self.pattern.captures(line) else {
            return Ok(None);
        };
        let group = |i: usize| caps.get(i).map(|m| m.as_str()).ok_or(LineError::MissingGroup(i));

        Ok(Some(Outcome::Entry(LogEntry {
            timestamp: group(1)?.replacen('T', " ", 1).replacen('Z', "", 1),
            stream: LogStream::pick(group(2)? == "stderr"),
            message: strip_control(group(3)?),
        })))
    }
}

// ── Tier 2: control-byte prefixed frame remnants ────────────────

pub struct FramedLine {
    timestamp: Regex,
}

impl FramedLine {
    pub fn new() -> Result<Self, LineError> {
        Ok(Self {
            timestamp: Regex::new(r"(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}[.,]\d+Z?)")?,
        })
    }
}

impl LineMatcher for FramedLine {
    fn name(&self) -> &'static str {
        "framed"
    }

    fn try_parse(&self, line: &str) -> Result<Option<Outcome>, LineError> {
        if !line.chars().next().is_some_and(|c| (c as u32) <= 31) {
            return Ok(None);
        }
        // Header bytes without a recognisable timestamp carry nothing usable.
        let Some(found) = self.timestamp.find(line) else {
            return Ok(Some(Outcome::Discard));
        };

        let timestamp = found
            .as_str()
            .replacen('T', " ", 1)
            .replace(',', ".")
            .replace('Z', "");
        let message = strip_control(&line[found.end()..]);
        if message.is_empty() {
            return Ok(Some(Outcome::Discard));
        }

        Ok(Some(Outcome::Entry(LogEntry {
            timestamp,
            stream: LogStream::pick(line.contains("stderr")),
            message,
        })))
    }
}

// ── Tier 3: free text ───────────────────────────────────────────

pub struct FreeText {
    whitespace: Regex,
}

impl FreeText {
    pub fn new() -> Result<Self, LineError> {
        Ok(Self {
            whitespace: Regex::new(r"\s+")?,
        })
    }
}

impl LineMatcher for FreeText {
    fn name(&self) -> &'static str {
        "free-text"
    }

    fn try_parse(&self, line: &str) -> Result<Option<Outcome>, LineError> {
        let spaced: String = line
            .chars()
            .map(|c| if is_control(c) { ' ' } else { c })
            .collect();
        let message = self.whitespace.replace_all(&spaced, " ").trim().to_string();

        Ok(Some(Outcome::Entry(LogEntry {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            stream: LogStream::pick(message.to_lowercase().contains("error")),
            message,
        })))
    }
}

fn is_control(c: char) -> bool {
    (c as u32) <= 31
}

/// Drop every control character, then trim.
fn strip_control(raw: &str) -> String {
    let kept: String = raw.chars().filter(|c| !is_control(*c)).collect();
    kept.trim().to_string()
}

// ── Chain ───────────────────────────────────────────────────────

/// Ordered matcher chain. Build once and share; matching is read-only.
pub struct LogParser {
    tiers: Vec<Box<dyn LineMatcher>>,
}

impl LogParser {
    pub fn new() -> Result<Self, LineError> {
        Ok(Self {
            tiers: vec![
                Box::new(TaggedLine::new()?),
                Box::new(FramedLine::new()?),
                Box::new(FreeText::new()?),
            ],
        })
    }

    /// Parse every non-blank line independently, keeping daemon order.
    pub fn parse(&self, raw: &str) -> Vec<LogEntry> {
        raw.split('\n')
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match self.parse_line(line) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(line = %line, error = %e, "Failed to parse log line");
                    None
                }
            })
            .filter(|entry| !entry.message.is_empty() && entry.message != "Z")
            .collect()
    }

    /// Run one line through the chain.
    pub fn parse_line(&self, line: &str) -> Result<Option<LogEntry>, LineError> {
        for tier in &self.tiers {
            match tier.try_parse(line)? {
                Some(Outcome::Entry(entry)) => return Ok(Some(entry)),
                Some(Outcome::Discard) => {
                    tracing::trace!(tier = tier.name(), "Discarded log line");
                    return Ok(None);
                }
                None => continue,
            }
        }
        Ok(None)
    }
}
