//! Text-to-number and text-to-time conversions for scraped values.
//!
//! These never fail: counts that don't parse become 0 and timestamps that
//! don't parse become "now". The fields they feed are presentation metrics,
//! not existence signals, so a quiet default beats a hard error.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::LazyLock;

static MAGNITUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*([KMB])?").expect("magnitude regex"));

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*)\s*-\s*(\d[\d,]*)").expect("range regex"));

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d,]*").expect("count regex"));

/// Parse a follower-style count like "2.5M" or "15,234 followers".
///
/// Accepts a decimal number with optional thousands separators followed by an
/// optional K/M/B suffix, anywhere in the surrounding prose. Truncates toward
/// zero. Text with no number at all yields 0.
pub fn magnitude(text: &str) -> i64 {
    let upper = text.to_uppercase();
    let Some(caps) = MAGNITUDE_RE.captures(&upper) else {
        return 0;
    };
    let number: f64 = match caps[1].replace(',', "").parse() {
        Ok(n) => n,
        Err(_) => return 0,
    };
    let factor = match caps.get(2).map(|m| m.as_str()) {
        Some("K") => 1_000.0,
        Some("M") => 1_000_000.0,
        Some("B") => 1_000_000_000.0,
        _ => 1.0,
    };
    (number * factor) as i64
}

/// Parse an employee-size bucket like "51-200 employees" to its midpoint,
/// rounding down. A single number ("10,001+") is returned as-is; no number
/// yields 0.
pub fn size_range(text: &str) -> i64 {
    if let Some(caps) = RANGE_RE.captures(text) {
        let low = strip_separators(&caps[1]);
        let high = strip_separators(&caps[2]);
        return (low + high) / 2;
    }
    count(text)
}

/// First integer in the text, thousands separators allowed. Defaults to 0.
pub fn count(text: &str) -> i64 {
    COUNT_RE
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}

fn strip_separators(digits: &str) -> i64 {
    digits.replace(',', "").parse().unwrap_or(0)
}

/// Convert relative post age ("3 days ago", "2 weeks ago") to an absolute
/// timestamp. Minutes and hours collapse to `now`, and so does anything the
/// parser doesn't recognize — an accepted approximation, not an error.
pub fn relative_time(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let lower = text.to_lowercase();
    if lower.contains("minute") || lower.contains("hour") {
        return now;
    }
    if lower.contains("week") {
        return now - Duration::weeks(count(&lower));
    }
    if lower.contains("day") {
        return now - Duration::days(count(&lower));
    }
    now
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_plain() {
        assert_eq!(magnitude("15,234 followers"), 15_234);
        assert_eq!(magnitude("500"), 500);
    }

    #[test]
    fn test_magnitude_suffixes() {
        assert_eq!(magnitude("2.5K"), 2_500);
        assert_eq!(magnitude("2.5M followers"), 2_500_000);
        assert_eq!(magnitude("1.2B"), 1_200_000_000);
        assert_eq!(magnitude("3m followers"), 3_000_000);
    }

    #[test]
    fn test_magnitude_defaults_to_zero() {
        assert_eq!(magnitude("no data here"), 0);
        assert_eq!(magnitude(""), 0);
    }

    #[test]
    fn test_size_range_midpoint() {
        assert_eq!(size_range("11-50"), 30);
        assert_eq!(size_range("51-200 employees"), 125);
        assert_eq!(size_range("1,001-5,000 employees"), 3_000);
    }

    #[test]
    fn test_size_range_single_number() {
        assert_eq!(size_range("10000+"), 10_000);
        assert_eq!(size_range("10,001+ employees"), 10_001);
    }

    #[test]
    fn test_size_range_empty() {
        assert_eq!(size_range(""), 0);
        assert_eq!(size_range("unknown"), 0);
    }

    #[test]
    fn test_count() {
        assert_eq!(count("1,234"), 1_234);
        assert_eq!(count("123 comments"), 123);
        assert_eq!(count(""), 0);
        assert_eq!(count("no numbers"), 0);
    }

    #[test]
    fn test_relative_time_sub_day_collapses_to_now() {
        let now = Utc::now();
        assert_eq!(relative_time("5 hours ago", now), now);
        assert_eq!(relative_time("12 minutes ago", now), now);
    }

    #[test]
    fn test_relative_time_days_and_weeks() {
        let now = Utc::now();
        assert_eq!(relative_time("3 days ago", now), now - Duration::days(3));
        assert_eq!(relative_time("2 weeks ago", now), now - Duration::days(14));
        assert_eq!(relative_time("1 week ago", now), now - Duration::days(7));
    }

    #[test]
    fn test_relative_time_unrecognized_defaults_to_now() {
        let now = Utc::now();
        assert_eq!(relative_time("", now), now);
        assert_eq!(relative_time("a while back", now), now);
        assert_eq!(relative_time("3 months ago", now), now);
    }
}
