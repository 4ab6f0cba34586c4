//! Stock default producers for field declarations.

use chrono::Utc;
use uuid::Uuid;

/// Primary key for string-keyed tables: a zero-padded 15-digit millisecond
/// timestamp, a v4 UUID in hex and a `000` suffix. 50 characters, so it fits
/// `varchar(50)`, and ids sort by creation time.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Seconds since the Unix epoch.
pub fn now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
