//! Wire datetime formatting and zone-preserving date/time merges.
//!
//! The record API expects `YYYY-MM-DDTHH:mm:ss` in UTC: second precision,
//! no fractional part, no offset suffix.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::error::SyncError;

/// `strftime` pattern of the wire format.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// An instant tagged with the timezone identifier it was picked in.
///
/// Two values are only merge-compatible when their identifiers match
/// exactly; equal offsets are not enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonedDateTime {
    zone: String,
    at: DateTime<FixedOffset>,
}

impl ZonedDateTime {
    pub fn new(zone: impl Into<String>, at: DateTime<FixedOffset>) -> Self {
        Self {
            zone: zone.into(),
            at,
        }
    }

    /// Parse an RFC 3339 timestamp and tag it with `zone`.
    pub fn parse(zone: impl Into<String>, rfc3339: &str) -> Result<Self, SyncError> {
        let at = DateTime::parse_from_rfc3339(rfc3339)
            .map_err(|_| SyncError::InvalidDatetime(rfc3339.to_string()))?;
        Ok(Self::new(zone, at))
    }

    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }

    #[must_use]
    pub const fn at(&self) -> DateTime<FixedOffset> {
        self.at
    }

    #[must_use]
    pub fn to_wire_format(&self) -> String {
        to_wire_format(&self.at)
    }
}

/// Format `instant` for the wire.
pub fn to_wire_format<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    let raw = instant.with_timezone(&Utc).format(WIRE_FORMAT).to_string();
    normalize_wire(raw)
}

/// Force the date/time separator to `T` and a `24` hour to `00`.
///
/// The remote system rejects anything else; the fix is applied after
/// formatting rather than trusting the formatter.
fn normalize_wire(raw: String) -> String {
    // The time of day is always the trailing `HH:MM:SS`.
    let Some(split) = raw.len().checked_sub(9) else {
        return raw;
    };
    if !raw.is_char_boundary(split) || !raw.is_char_boundary(split + 1) {
        return raw;
    }
    let (date, rest) = raw.split_at(split);
    let time = &rest[1..];
    match time.strip_prefix("24") {
        Some(minutes) => format!("{date}T00{minutes}"),
        None => format!("{date}T{time}"),
    }
}

/// Parse a datetime as the record API returns it.
///
/// Accepts the wire format (read as UTC), RFC 3339, and the
/// `2018-08-19T17:00:00.000+0000` form.
pub fn parse_wire(text: &str) -> Result<DateTime<Utc>, SyncError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, WIRE_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at.with_timezone(&Utc));
    }
    DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z")
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| SyncError::InvalidDatetime(text.to_string()))
}

/// Combine the calendar date of `date` with the time of day of `time`.
///
/// The result keeps `date`'s zone and offset.
pub fn merge_date_and_time(
    date: &ZonedDateTime,
    time: &ZonedDateTime,
) -> Result<ZonedDateTime, SyncError> {
    if date.zone != time.zone {
        return Err(SyncError::IncompatibleTimezone {
            date_zone: date.zone.clone(),
            time_zone: time.zone.clone(),
        });
    }

    let local = date.at.date_naive().and_time(time.at.time());
    let offset = *date.at.offset();
    let at = offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| SyncError::InvalidDatetime(local.to_string()))?;
    Ok(ZonedDateTime::new(date.zone.clone(), at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const LA: &str = "America/Los_Angeles";

    #[test]
    fn wire_format_is_utc_without_fraction_or_offset() {
        let at = DateTime::parse_from_rfc3339("2018-08-19T10:30:15.250-07:00").expect("parse");
        assert_eq!(to_wire_format(&at), "2018-08-19T17:30:15");
    }

    #[test]
    fn wire_format_crosses_the_date_line() {
        let at = DateTime::parse_from_rfc3339("2018-12-31T20:00:00-05:00").expect("parse");
        assert_eq!(to_wire_format(&at), "2019-01-01T01:00:00");
    }

    #[test]
    fn normalization_repairs_separator_and_hour() {
        assert_eq!(
            normalize_wire("2018-08-19t17:30:00".into()),
            "2018-08-19T17:30:00"
        );
        assert_eq!(
            normalize_wire("2018-08-19 24:05:00".into()),
            "2018-08-19T00:05:00"
        );
        assert_eq!(normalize_wire("short".into()), "short");
    }

    #[test]
    fn merge_keeps_date_and_takes_time() {
        let date = ZonedDateTime::parse(LA, "2018-08-19T00:00:00-07:00").expect("date");
        let time = ZonedDateTime::parse(LA, "2018-01-01T10:30:00-07:00").expect("time");
        let merged = merge_date_and_time(&date, &time).expect("same zone");
        assert_eq!(merged.zone(), LA);
        assert_eq!(merged.at().to_rfc3339(), "2018-08-19T10:30:00-07:00");
    }

    #[test]
    fn merge_rejects_different_zone_ids_even_with_equal_offsets() {
        let date = ZonedDateTime::parse(LA, "2018-08-19T00:00:00-07:00").expect("date");
        let time = ZonedDateTime::parse("America/Phoenix", "2018-01-01T10:30:00-07:00")
            .expect("time");
        let err = merge_date_and_time(&date, &time).expect_err("zones differ");
        assert_eq!(
            err,
            SyncError::IncompatibleTimezone {
                date_zone: LA.into(),
                time_zone: "America/Phoenix".into(),
            }
        );
    }

    #[test]
    fn parse_accepts_api_forms() {
        let expected = Utc.with_ymd_and_hms(2018, 8, 19, 17, 0, 0).single().expect("valid");
        assert_eq!(parse_wire("2018-08-19T17:00:00").expect("wire"), expected);
        assert_eq!(parse_wire("2018-08-19T17:00:00.000+0000").expect("api"), expected);
        assert_eq!(parse_wire("2018-08-19T10:00:00-07:00").expect("rfc3339"), expected);
        assert!(parse_wire("yesterday").is_err());
    }

    #[test]
    fn shifted_wire_values_stay_in_format() {
        let start = parse_wire("2018-08-19T23:30:00").expect("wire");
        assert_eq!(
            to_wire_format(&(start + Duration::minutes(45))),
            "2018-08-20T00:15:00"
        );
    }
}
