//! Timestamp helpers shared by the sources and the uploader.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{AppError, AppResult};

/// Parse an HTTP `Last-Modified` header (`Wed, 21 Oct 2015 07:28:00 GMT`).
#[must_use]
pub fn parse_last_modified(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format as ISO-8601 UTC with millisecond precision, e.g. `2019-08-19T23:00:00.000Z`.
#[must_use]
pub fn to_iso8601(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a zone offset such as `-06:00`, `+0530`, `Z` or `GMT-06:00`.
///
/// # Errors
///
/// Returns `AppError::Timestamp` if the offset is not recognised.
pub fn parse_zone_offset(offset: &str) -> AppResult<FixedOffset> {
    let trimmed = offset.trim();
    let trimmed = trimmed
        .strip_prefix("GMT")
        .or_else(|| trimmed.strip_prefix("UTC"))
        .unwrap_or(trimmed);

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| AppError::Timestamp(format!("invalid zone offset `{offset}`")));
    }

    let invalid = || AppError::Timestamp(format!("invalid zone offset `{offset}`"));

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.is_ascii() {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };

    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parse a zone-less logger timestamp and normalize it to UTC.
///
/// The zone offset is mandatory: logger clocks are local and guessing the zone
/// would silently shift every observation.
///
/// # Errors
///
/// Returns `AppError::Timestamp` if the offset is missing or either part fails to parse.
pub fn parse_logger_timestamp(
    time: &str,
    format: &str,
    zone_offset: Option<&str>,
) -> AppResult<DateTime<Utc>> {
    let offset = zone_offset
        .ok_or_else(|| AppError::Timestamp(format!("`{time}` has no zone offset")))
        .and_then(parse_zone_offset)?;

    let naive = NaiveDateTime::parse_from_str(time.trim(), format)
        .map_err(|e| AppError::Timestamp(format!("`{time}`: {e}")))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::Timestamp(format!("`{time}` is ambiguous")))
}

/// Parse an ISO-8601 date-time that carries its own zone.
///
/// # Errors
///
/// Returns `AppError::Timestamp` if the value is not RFC 3339 compatible.
pub fn parse_iso8601(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Timestamp(format!("`{value}`: {e}")))
}
