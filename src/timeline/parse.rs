//! Timestamp parsing shared by the transformers and the store.
//!
//! Every function returns `None` instead of guessing: a record whose
//! timestamp cannot be read has no place in a chronological timeline.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

/// Naive layouts seen in spider output and DB round-trips; read as UTC.
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 / RFC-3339 instant.
///
/// Accepts offsets (`Z`, `+08:00`), naive date-times (taken as UTC), bare
/// dates (UTC midnight) and, as a last resort, RFC-822 strings.
pub fn parse_iso_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // RFC-3339 requires the `T`; tolerate a space separator with an offset.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }

    parse_rfc2822_strict(s)
}

/// Parse an RSS `pubDate` (RFC-822/2822, e.g. `Mon, 04 Nov 2024 15:00:00 GMT`).
///
/// Falls back to a lenient `GMT`/`UTC` pattern (any month-name casing,
/// single-digit day) and then to ISO-8601.
pub fn parse_rfc822(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_rfc2822_strict(s)
        .or_else(|| parse_gmt_lenient(s))
        .or_else(|| parse_iso_instant_no_rfc(s))
}

fn parse_rfc2822_strict(s: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(s, &Rfc2822).ok()?;
    DateTime::<Utc>::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

fn parse_gmt_lenient(s: &str) -> Option<DateTime<Utc>> {
    static RE_GMT: OnceCell<Regex> = OnceCell::new();
    let re = RE_GMT.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:[a-z]+,\s*)?(\d{1,2})\s+([a-z]{3,9})\s+(\d{4})\s+(\d{1,2}):(\d{2}):(\d{2})\s+(?:GMT|UTC|UT|Z)$",
        )
        .expect("gmt regex")
    });
    let caps = re.captures(s)?;

    let day: u32 = caps[1].parse().ok()?;
    let month = month_from_name(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;
    let second: u32 = caps[6].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, second)
        .map(|n| n.and_utc())
}

fn month_from_name(name: &str) -> Option<u32> {
    let key: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let m = match key.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

// ISO path without the RFC-822 tail, so `parse_rfc822` does not loop back.
fn parse_iso_instant_no_rfc(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn iso_with_zulu_and_offset() {
        assert_eq!(
            parse_iso_instant("2024-01-15T08:00:00Z"),
            Some(utc(2024, 1, 15, 8, 0, 0))
        );
        assert_eq!(
            parse_iso_instant("2024-01-15T16:00:00+08:00"),
            Some(utc(2024, 1, 15, 8, 0, 0))
        );
    }

    #[test]
    fn naive_python_isoformat_is_utc() {
        let got = parse_iso_instant("2025-11-10T17:50:53.987738").unwrap();
        assert_eq!(got.timestamp(), utc(2025, 11, 10, 17, 50, 53).timestamp());
    }

    #[test]
    fn mysql_datetime_and_bare_date() {
        assert_eq!(
            parse_iso_instant("2024-03-01 10:20:30"),
            Some(utc(2024, 3, 1, 10, 20, 30))
        );
        assert_eq!(parse_iso_instant("2024-03-01"), Some(utc(2024, 3, 1, 0, 0, 0)));
    }

    #[test]
    fn garbage_and_empty_are_none() {
        assert_eq!(parse_iso_instant(""), None);
        assert_eq!(parse_iso_instant("   "), None);
        assert_eq!(parse_iso_instant("3 days ago"), None);
        assert_eq!(parse_iso_instant("2024-13-45T99:00:00Z"), None);
    }

    #[test]
    fn rfc822_gmt() {
        assert_eq!(
            parse_rfc822("Mon, 04 Nov 2024 15:00:00 GMT"),
            Some(utc(2024, 11, 4, 15, 0, 0))
        );
        assert_eq!(
            parse_rfc822("Fri, 19 Sep 2025 22:23:49 +0800"),
            Some(utc(2025, 9, 19, 14, 23, 49))
        );
    }

    #[test]
    fn rfc822_lenient_casing_and_single_digit_day() {
        assert_eq!(
            parse_rfc822("Fri, 5 SEP 2025 22:23:49 GMT"),
            Some(utc(2025, 9, 5, 22, 23, 49))
        );
    }

    #[test]
    fn rfc822_falls_back_to_iso() {
        assert_eq!(
            parse_rfc822("2024-11-04T15:00:00+00:00"),
            Some(utc(2024, 11, 4, 15, 0, 0))
        );
        assert_eq!(parse_rfc822("yesterday"), None);
    }
}
