//! Platform abstraction layer
//!
//! Handles browser/native differences for wall-clock time and calendar
//! formatting. Simulations never call into here; only seeding, leaderboard
//! dates and the entry points do.

use chrono::{DateTime, Utc};

/// `created_at` layout used by the leaderboard service
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn wall_clock_ms() -> f64 {
    js_sys::Date::now()
}

/// Milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn wall_clock_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Format a Unix timestamp (ms) the way the hosted leaderboard dates rows
pub fn format_utc(timestamp_ms: f64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms.max(0.0) as i64)
        .unwrap_or_default()
        .format(DATE_FORMAT)
        .to_string()
}
