//! Publication date normalization and the recency window.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A feed date after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Naive-UTC ISO-8601 when parsed, otherwise the raw feed string.
    pub text: String,
    pub at: Option<DateTime<Utc>>,
}

/// Parse RFC 2822 (RSS) or RFC 3339 (Atom) dates. Unparseable input is
/// kept verbatim with no timestamp.
pub fn normalize_published(raw: &str) -> Published {
    let trimmed = raw.trim();
    let parsed = DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, ISO_FORMAT)
                .ok()
                .map(|naive| naive.and_utc())
        });

    match parsed {
        Some(at) => Published {
            text: at.format(ISO_FORMAT).to_string(),
            at: Some(at),
        },
        None => Published {
            text: raw.to_string(),
            at: None,
        },
    }
}

/// Only entries published within the last `hours` are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    pub hours: u32,
}

impl RecencyWindow {
    pub fn hours(hours: u32) -> Self {
        Self { hours }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(i64::from(self.hours))
    }

    /// Undated entries are always inside the window.
    pub fn contains(&self, published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match published {
            Some(at) => at >= self.cutoff(now),
            None => true,
        }
    }
}

impl Default for RecencyWindow {
    fn default() -> Self {
        Self { hours: 24 }
    }
}
