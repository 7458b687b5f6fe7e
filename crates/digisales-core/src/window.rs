//! # Fetch Windows
//!
//! Time handling for the Digiseller listing call.
//!
//! The remote API speaks naive `YYYY-MM-DD HH:MM:SS` strings interpreted in
//! Moscow time. Moscow has had no DST since 2014, so the zone is modelled as
//! a fixed `UTC+03:00` offset.
//!
//! ## Watermark Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  max(date_pay) present?  ── yes ──► max(date_pay) + 1s                  │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  max(date_put) present?  ── yes ──► max(date_put) + 1s                  │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  2020-01-01 00:00:00 MSK (sync epoch)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The window end is always "now" in the remote zone. Because the start
//! only moves forward and inserts are idempotent, overlapping windows are
//! harmless.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

use crate::error::ValidationError;

/// Timestamp format used by the remote API in both directions.
pub const REMOTE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset of the remote reference zone (Europe/Moscow) from UTC.
pub const REMOTE_UTC_OFFSET_SECS: i32 = 3 * 3600;

/// 2020-01-01 00:00:00 MSK as a unix timestamp.
pub const SYNC_EPOCH_UNIX: i64 = 1_577_826_000;

/// The remote reference zone.
pub fn remote_zone() -> FixedOffset {
    FixedOffset::east_opt(REMOTE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Start of the first window when nothing has been stored yet.
pub fn sync_epoch() -> DateTime<FixedOffset> {
    DateTime::from_timestamp(SYNC_EPOCH_UNIX, 0)
        .unwrap_or_default()
        .with_timezone(&remote_zone())
}

/// Converts any instant into the remote zone.
pub fn to_remote(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&remote_zone())
}

/// Parses a remote timestamp string and stamps it with the remote zone.
pub fn parse_remote_timestamp(
    field: &str,
    value: &str,
) -> Result<DateTime<FixedOffset>, ValidationError> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), REMOTE_TIMESTAMP_FORMAT)
        .map_err(|_| ValidationError::invalid_format(field, "expected YYYY-MM-DD HH:MM:SS"))?;

    remote_zone()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ValidationError::invalid_format(field, "not representable in remote zone"))
}

/// Formats an instant as the remote API expects it (remote zone, no offset).
pub fn format_remote_timestamp<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant
        .with_timezone(&remote_zone())
        .format(REMOTE_TIMESTAMP_FORMAT)
        .to_string()
}

/// Computes where the next fetch window starts.
///
/// `latest_pay` wins over `latest_put`; whichever is used is advanced by one
/// second. With neither, the window starts at [`sync_epoch`].
pub fn next_window_start(
    latest_pay: Option<DateTime<Utc>>,
    latest_put: Option<DateTime<Utc>>,
) -> DateTime<FixedOffset> {
    match latest_pay.or(latest_put) {
        Some(latest) => to_remote(latest + Duration::seconds(1)),
        None => sync_epoch(),
    }
}

// =============================================================================
// Fetch Window
// =============================================================================

/// A range of remote time to request, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl FetchWindow {
    /// Window from `start` up to `now`, both in the remote zone.
    pub fn until(start: DateTime<FixedOffset>, now: DateTime<Utc>) -> Self {
        FetchWindow {
            start: start.with_timezone(&remote_zone()),
            end: to_remote(now),
        }
    }

    /// `date_start` request field.
    pub fn date_start(&self) -> String {
        format_remote_timestamp(&self.start)
    }

    /// `date_finish` request field.
    pub fn date_finish(&self) -> String {
        format_remote_timestamp(&self.end)
    }

    /// Splits the window into two halves that do not overlap.
    ///
    /// Both bounds are sent at whole-second precision, so the second half
    /// starts one second after the first ends. Windows shorter than one
    /// second cannot be split.
    pub fn split(&self) -> Option<(FetchWindow, FetchWindow)> {
        let span = (self.end - self.start).num_seconds();
        if span < 1 {
            return None;
        }

        let mid = self.start + Duration::seconds(span / 2);
        Some((
            FetchWindow {
                start: self.start,
                end: mid,
            },
            FetchWindow {
                start: mid + Duration::seconds(1),
                end: self.end,
            },
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, REMOTE_TIMESTAMP_FORMAT)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_epoch_is_new_year_2020_moscow() {
        let epoch = sync_epoch();
        assert_eq!(epoch.offset().local_minus_utc(), 3 * 3600);
        assert_eq!(format_remote_timestamp(&epoch), "2020-01-01 00:00:00");
    }

    #[test]
    fn test_empty_store_falls_back_to_epoch() {
        assert_eq!(next_window_start(None, None), sync_epoch());
    }

    #[test]
    fn test_pay_time_wins_over_put_time() {
        let pay = utc("2024-03-01 09:00:00");
        let put = utc("2024-05-01 09:00:00");
        let start = next_window_start(Some(pay), Some(put));
        assert_eq!(start.with_timezone(&Utc), pay + Duration::seconds(1));
    }

    #[test]
    fn test_put_time_used_without_pay_time() {
        let put = utc("2024-05-01 09:00:00");
        let start = next_window_start(None, Some(put));
        // 09:00:01 UTC is 12:00:01 in Moscow
        assert_eq!(format_remote_timestamp(&start), "2024-05-01 12:00:01");
    }

    #[test]
    fn test_start_strictly_after_latest() {
        let latest = utc("2023-12-31 23:59:59");
        let start = next_window_start(Some(latest), None);
        assert!(start.with_timezone(&Utc) > latest);
    }

    #[test]
    fn test_parse_remote_timestamp() {
        let parsed = parse_remote_timestamp("date_put", "2024-02-10 15:30:00").unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), REMOTE_UTC_OFFSET_SECS);
        assert_eq!(parsed.with_timezone(&Utc), utc("2024-02-10 12:30:00"));

        assert!(parse_remote_timestamp("date_put", "10.02.2024 15:30").is_err());
        assert!(parse_remote_timestamp("date_put", "").is_err());
    }

    #[test]
    fn test_window_fields_use_remote_format() {
        let start = parse_remote_timestamp("date_start", "2024-01-01 00:00:01").unwrap();
        let window = FetchWindow::until(start, utc("2024-01-02 07:00:00"));
        assert_eq!(window.date_start(), "2024-01-01 00:00:01");
        assert_eq!(window.date_finish(), "2024-01-02 10:00:00");
    }

    #[test]
    fn test_split_covers_window_without_overlap() {
        let start = parse_remote_timestamp("date_start", "2024-01-01 00:00:00").unwrap();
        let window = FetchWindow::until(start, utc("2024-01-01 21:00:10"));

        let (first, second) = window.split().unwrap();
        assert_eq!(first.date_start(), "2024-01-01 00:00:00");
        assert_eq!(first.date_finish(), "2024-01-01 12:00:05");
        assert_eq!(second.date_start(), "2024-01-01 12:00:06");
        assert_eq!(second.date_finish(), "2024-01-02 00:00:10");
    }

    #[test]
    fn test_split_down_to_single_seconds() {
        let start = parse_remote_timestamp("date_start", "2024-01-01 00:00:00").unwrap();
        let window = FetchWindow::until(start, utc("2023-12-31 21:00:01"));

        let (first, second) = window.split().unwrap();
        assert_eq!(first.date_finish(), "2024-01-01 00:00:00");
        assert_eq!(second.date_start(), "2024-01-01 00:00:01");
        assert!(first.split().is_none());
        assert!(second.split().is_none());
    }
}
