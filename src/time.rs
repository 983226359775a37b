//! Timestamp rendering and conversion.
//!
//! Timestamps travel between components as UTC with microsecond precision
//! (`2023-01-01 00:00:00.000000`) and are stored as epoch seconds.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format used for exchanged and logged timestamps.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS.ffffff`.
pub fn render(ts: DateTime<Utc>) -> String {
    ts.format(TIME_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD HH:MM:SS[.ffffff]` UTC timestamp.
pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Epoch seconds with a microsecond fraction.
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}
