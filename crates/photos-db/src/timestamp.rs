//! Fixed-width UTC timestamps. Every stored value has the same length, so
//! string order in SQLite matches chronological order.

use chrono::{DateTime, NaiveDateTime, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn format(ts: DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, FORMAT).map(|ndt| ndt.and_utc())
}

/// Truncate to the stored precision so in-memory copies compare equal to
/// what a later read returns.
pub fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = ts.timestamp_subsec_nanos();
    ts - chrono::Duration::nanoseconds(i64::from(nanos % 1_000))
}
