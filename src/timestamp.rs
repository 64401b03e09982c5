//! Normalization of the timestamp formats found in real-world feeds.
//!
//! Feeds disagree about dates: RSS publishes RFC 822 strings
//! (`Fri, 08 Jan 2021 11:00:00 +0900`), Atom publishes ISO 8601
//! (`2021-01-08T11:00:00+09:00`), and plenty of feeds serve something in
//! between. Everything is normalized to a `chrono::NaiveDateTime` carrying
//! the *local clock fields* of the source string.
//!
//! Note on offsets: the RFC 822 path parses a full offset-aware datetime and
//! then drops the offset (`naive_local`), while the ISO fallback never parses
//! the offset at all. Both paths therefore agree field-for-field on the same
//! local-clock instant, but neither preserves the zone — watermark equality
//! is a clock-field comparison, which is exactly how the stored state is
//! defined.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Errors produced while normalizing feed timestamps.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The string matched neither the RFC 822 shape nor the ISO fallback.
    #[error("malformed feed timestamp: {0:?}")]
    Malformed(String),
    /// A feed item carried no timestamp at all.
    #[error("feed item has no timestamp")]
    Missing,
    /// Pre-split calendar fields that do not form a valid date/time.
    #[error("calendar fields out of range: {0}")]
    OutOfRange(String),
}

/// Parse a feed-supplied timestamp string into a canonical `NaiveDateTime`.
///
/// Tries RFC 822/2822 first; on failure falls back to splitting on `T` or
/// `+` and reading `YYYY-MM-DD` / `HH:MM:SS` segments. The fallback discards
/// sub-second precision and any timezone offset.
///
/// # Errors
///
/// Returns [`TimestampError::Malformed`] when neither shape matches. Callers
/// abort that feed's sync; this never panics.
pub fn parse_feed_timestamp(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        // Keep the source's clock fields, drop the offset (see module docs)
        return Ok(dt.naive_local());
    }

    parse_iso_like(trimmed).ok_or_else(|| TimestampError::Malformed(raw.to_owned()))
}

/// Build a canonical timestamp from calendar fields an upstream parser has
/// already split (year/month/day/hour/minute/second). No string parsing.
///
/// # Errors
///
/// Returns [`TimestampError::OutOfRange`] for fields that do not form a
/// valid date or time (e.g. month 13, hour 25).
pub fn from_parts(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<NaiveDateTime, TimestampError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| {
            TimestampError::OutOfRange(format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ))
        })
}

/// ISO-8601-like fallback: `<date>T<time>[offset]` or `<date>+<time>`.
fn parse_iso_like(raw: &str) -> Option<NaiveDateTime> {
    let mut segments = raw.splitn(3, ['T', '+']);
    let date_seg = segments.next()?;
    let time_seg = segments.next()?;

    let mut date_parts = date_seg.split('-');
    let year: i32 = date_parts.next()?.parse().ok()?;
    let month: u32 = date_parts.next()?.parse().ok()?;
    let day: u32 = date_parts.next()?.parse().ok()?;

    let mut time_parts = time_seg.split(':');
    let hour: u32 = time_parts.next()?.parse().ok()?;
    let minute: u32 = time_parts.next()?.parse().ok()?;
    // Seconds may trail sub-second digits, `Z`, or a negative offset; keep
    // the leading digits only.
    let second: u32 = leading_digits(time_parts.next()?).parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc822_shape() {
        let dt = parse_feed_timestamp("Fri, 08 Jan 2021 11:00:00 +0900").unwrap();
        assert_eq!(
            (dt.year(), dt.month(), dt.day()),
            (2021, 1, 8),
        );
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (11, 0, 0));
    }

    #[test]
    fn test_iso_shape() {
        let dt = parse_feed_timestamp("2021-01-08T11:00:00+09:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2021, 1, 8));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (11, 0, 0));
    }

    // Both accepted shapes for the same source clock reading normalize to
    // identical calendar fields. The offset itself is discarded on both
    // paths — that discrepancy is documented, not hidden.
    #[test]
    fn test_both_shapes_agree_on_clock_fields() {
        let rfc = parse_feed_timestamp("Fri, 08 Jan 2021 11:00:00 +0900").unwrap();
        let iso = parse_feed_timestamp("2021-01-08T11:00:00+09:00").unwrap();
        assert_eq!(rfc, iso);
    }

    #[test]
    fn test_iso_with_plus_separator() {
        // Some feeds join date and time with '+' instead of 'T'
        let dt = parse_feed_timestamp("2021-01-08+11:00:00").unwrap();
        assert_eq!((dt.month(), dt.hour()), (1, 11));
    }

    #[test]
    fn test_iso_subseconds_discarded() {
        let dt = parse_feed_timestamp("2021-01-08T11:00:00.123456+09:00").unwrap();
        assert_eq!(dt.second(), 0);
        assert_eq!(dt.and_utc().timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_iso_zulu_suffix() {
        let dt = parse_feed_timestamp("2021-01-08T11:00:00Z").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (11, 0, 0));
    }

    #[test]
    fn test_iso_negative_offset_discarded() {
        let dt = parse_feed_timestamp("2021-01-08T11:00:00-05:00").unwrap();
        assert_eq!(dt.hour(), 11);
    }

    #[test]
    fn test_malformed_rejected() {
        for bad in ["", "not a date", "08/01/2021", "2021-01-08"] {
            let err = parse_feed_timestamp(bad).unwrap_err();
            assert!(matches!(err, TimestampError::Malformed(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_from_parts_direct_copy() {
        let dt = from_parts(2021, 1, 8, 11, 0, 0).unwrap();
        assert_eq!(dt, parse_feed_timestamp("2021-01-08T11:00:00+09:00").unwrap());
    }

    #[test]
    fn test_from_parts_out_of_range() {
        assert!(matches!(
            from_parts(2021, 13, 1, 0, 0, 0),
            Err(TimestampError::OutOfRange(_))
        ));
        assert!(matches!(
            from_parts(2021, 2, 30, 0, 0, 0),
            Err(TimestampError::OutOfRange(_))
        ));
    }
}
