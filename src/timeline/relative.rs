//! Relative-date labels ("today", "3 days ago", ...).
//!
//! The clock is a parameter: the same `(now, published_at)` pair always
//! yields the same label.

use chrono::{DateTime, Utc};

/// Bucket the elapsed whole days between `published_at` and `now`.
///
/// Future instants (clock skew upstream) are reported as "today".
pub fn format_relative_time(now: DateTime<Utc>, published_at: DateTime<Utc>) -> String {
    let days = (now - published_at).num_days();

    match days {
        d if d <= 0 => "today".to_string(),
        1 => "yesterday".to_string(),
        d if d < 7 => format!("{d} days ago"),
        d if d < 30 => plural(d / 7, "week"),
        d if d < 365 => plural(d / 30, "month"),
        d => plural(d / 365, "year"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
