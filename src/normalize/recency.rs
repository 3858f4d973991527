use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// True when `published` lies strictly less than `window` before `now`.
/// Timestamps in the future count as inside the window.
pub fn is_within_window(published: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let elapsed = now.signed_duration_since(published);
    match elapsed.to_std() {
        Ok(elapsed) => elapsed < window,
        Err(_) => true,
    }
}

/// Parse an RFC 3339 or RFC 2822 timestamp.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAgo {
    JustNow,
    Minutes(i64),
    Hours(i64),
    Days(i64),
}

pub fn time_ago(published: DateTime<Utc>, now: DateTime<Utc>) -> TimeAgo {
    let seconds = now.signed_duration_since(published).num_seconds();
    if seconds < 60 {
        TimeAgo::JustNow
    } else if seconds < 3600 {
        TimeAgo::Minutes(seconds / 60)
    } else if seconds < 86_400 {
        TimeAgo::Hours(seconds / 3600)
    } else {
        TimeAgo::Days(seconds / 86_400)
    }
}

impl fmt::Display for TimeAgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeAgo::JustNow => write!(f, "Just now"),
            TimeAgo::Minutes(m) => write!(f, "{}m ago", m),
            TimeAgo::Hours(h) => write!(f, "{}h ago", h),
            TimeAgo::Days(d) => write!(f, "{}d ago", d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn test_window_is_strict() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        assert!(is_within_window(now - ChronoDuration::hours(23), now, DAY));
        assert!(!is_within_window(now - ChronoDuration::hours(24), now, DAY));
        assert!(!is_within_window(now - ChronoDuration::hours(25), now, DAY));
        assert!(is_within_window(now + ChronoDuration::minutes(5), now, DAY));
    }

    #[test]
    fn test_parse_published_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 12, 28, 0, 0, 0).unwrap();

        assert_eq!(parse_published("2023-12-28T00:00:00Z"), Some(expected));
        assert_eq!(
            parse_published("Thu, 28 Dec 2023 00:00:00 +0000"),
            Some(expected)
        );
        assert_eq!(parse_published("yesterday"), None);
        assert_eq!(parse_published(""), None);
    }

    #[test]
    fn test_time_ago_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        assert_eq!(time_ago(now - ChronoDuration::seconds(30), now), TimeAgo::JustNow);
        assert_eq!(time_ago(now - ChronoDuration::minutes(5), now), TimeAgo::Minutes(5));
        assert_eq!(time_ago(now - ChronoDuration::hours(3), now), TimeAgo::Hours(3));
        assert_eq!(time_ago(now - ChronoDuration::days(2), now), TimeAgo::Days(2));
        assert_eq!(time_ago(now + ChronoDuration::hours(1), now), TimeAgo::JustNow);
    }

    #[test]
    fn test_time_ago_display() {
        assert_eq!(TimeAgo::JustNow.to_string(), "Just now");
        assert_eq!(TimeAgo::Minutes(5).to_string(), "5m ago");
        assert_eq!(TimeAgo::Hours(3).to_string(), "3h ago");
        assert_eq!(TimeAgo::Days(2).to_string(), "2d ago");
    }
}
