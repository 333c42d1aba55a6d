//! Duration formatting helpers.

use chrono::Duration;

/// Formats a duration as `"1d 2h 3m 4s"`, dropping leading zero units.
///
/// Sub-second precision is truncated. Negative durations get a leading `-`.
pub fn format_elapsed(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{sign}{days}d {hours}h {minutes}m {secs}s")
    } else if hours > 0 {
        format!("{sign}{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m {secs}s")
    } else {
        format!("{sign}{secs}s")
    }
}

/// Converts a duration to fractional seconds (millisecond precision).
#[allow(clippy::cast_precision_loss)]
pub fn seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}
