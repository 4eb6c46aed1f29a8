//! Log retrieval helpers: query shape, `since` interpretation, and
//! rendering of demultiplexed daemon frames back into tagged text.

use bollard::container::LogOutput;
use chrono::{DateTime, Duration, Utc};

use crate::model::LogStream;

/// Window requested from the daemon for one log fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Opaque lower bound: Unix seconds, RFC3339, or a relative duration
    /// such as `15m`.
    pub since: Option<String>,
    /// Number of trailing lines; `None` means all.
    pub tail: Option<u64>,
}

impl LogQuery {
    pub fn new(since: Option<String>, tail: Option<u64>) -> Self {
        Self { since, tail }
    }

    /// Value for the daemon's `tail` parameter.
    pub fn tail_param(&self) -> String {
        self.tail
            .map(|n| n.to_string())
            .unwrap_or_else(|| "all".to_string())
    }

    /// Value for the daemon's `since` parameter (Unix seconds, 0 = unbounded).
    ///
    /// Bollard only accepts `i32` here; later instants clamp to `i32::MAX`.
    pub fn since_param(&self, now: DateTime<Utc>) -> i32 {
        let Some(raw) = self.since.as_deref() else { return 0 };
        match parse_since(raw, now) {
            Some(secs) => {
                if secs > i32::MAX as i64 {
                    tracing::warn!(since = secs, "since exceeds i32 range, clamping");
                }
                secs.clamp(0, i32::MAX as i64) as i32
            }
            None => {
                tracing::warn!(since = raw, "Unrecognised since value, fetching from the beginning");
                0
            }
        }
    }
}

/// Interpret a `since` value as Unix seconds.
///
/// Accepts plain (optionally fractional) seconds, RFC3339 timestamps, and
/// relative durations with an `s`/`m`/`h`/`d` suffix counted back from `now`.
pub fn parse_since(raw: &str, now: DateTime<Utc>) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(secs) = raw.parse::<f64>() {
        return secs.is_finite().then(|| secs.floor() as i64);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }

    let unit_start = raw.char_indices().last()?.0;
    let (amount, unit) = raw.split_at(unit_start);
    let amount: i64 = amount.parse().ok()?;
    let delta = match unit {
        "s" => Duration::try_seconds(amount)?,
        "m" => Duration::try_minutes(amount)?,
        "h" => Duration::try_hours(amount)?,
        "d" => Duration::try_days(amount)?,
        _ => return None,
    };
    Some((now - delta).timestamp())
}

/// Append one daemon frame to `out` as newline-terminated text.
///
/// With `timestamps: true` every payload line starts with an RFC3339
/// timestamp. Such lines are re-emitted as `<timestamp> <stream> <message>`
/// so the stream known from the frame header survives into parsing. Lines
/// without a leading timestamp are copied verbatim; lines that carry a
/// timestamp but no message are dropped.
pub fn render_frame(out: &mut String, output: LogOutput) {
    let (stream, payload) = match output {
        LogOutput::StdErr { message } => (LogStream::Stderr, message),
        LogOutput::StdOut { message } => (LogStream::Stdout, message),
        LogOutput::StdIn { message } => (LogStream::Stdout, message),
        LogOutput::Console { message } => (LogStream::Stdout, message),
    };

    let text = String::from_utf8_lossy(&payload);
    for line in text.lines() {
        match split_leading_timestamp(line) {
            Some((timestamp, rest)) => {
                if rest.trim().is_empty() {
                    continue;
                }
                out.push_str(timestamp);
                out.push(' ');
                out.push_str(stream.as_str());
                out.push(' ');
                out.push_str(rest);
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }
}

/// Split `"<rfc3339> <rest>"` into its parts when the first token is a
/// valid RFC3339 timestamp.
fn split_leading_timestamp(line: &str) -> Option<(&str, &str)> {
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    DateTime::parse_from_rfc3339(head).ok()?;
    Some((head, rest))
}
