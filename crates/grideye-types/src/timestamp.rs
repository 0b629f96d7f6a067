//! Capture timestamps.
//!
//! Records carry a UTC instant with millisecond precision. On the wire it is
//! written as `YYYY-MM-DDTHH:MM:SS.mmmZ`: always three fractional digits and
//! always a literal `Z`, never a `+00:00` offset.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::{ParseError, ParseResult};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Current UTC time truncated to whole milliseconds.
pub fn now_millis() -> OffsetDateTime {
    truncate_to_millis(OffsetDateTime::now_utc())
}

/// Convert to UTC and drop everything below one millisecond.
pub fn truncate_to_millis(at: OffsetDateTime) -> OffsetDateTime {
    let at = at.to_offset(UtcOffset::UTC);
    at.replace_millisecond(at.millisecond()).unwrap_or(at)
}

/// Render an instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// The instant is converted to UTC first, so callers may pass any offset.
/// Digits below one millisecond are dropped, not rounded.
///
/// # Example
///
/// ```
/// use grideye_types::format_timestamp;
/// use time::macros::datetime;
///
/// let at = datetime!(2024-01-01 12:30:45.123456 UTC);
/// assert_eq!(format_timestamp(at).unwrap(), "2024-01-01T12:30:45.123Z");
/// ```
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(UtcOffset::UTC).format(TIMESTAMP_FORMAT)
}

/// Parse a `YYYY-MM-DDTHH:MM:SS.mmmZ` string back into a UTC instant.
pub fn parse_timestamp(input: &str) -> ParseResult<OffsetDateTime> {
    PrimitiveDateTime::parse(input, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| ParseError::InvalidTimestamp {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

/// Serde adapter for fields rendered with [`format_timestamp`].
///
/// Use with `#[serde(with = "grideye_types::timestamp::millis_z")]`.
#[cfg(feature = "serde")]
pub mod millis_z {
    use ::serde::{Deserialize, Deserializer, Serializer, de, ser};
    use time::OffsetDateTime;

    /// Serialize as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub fn serialize<S>(at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rendered = super::format_timestamp(*at).map_err(ser::Error::custom)?;
        serializer.serialize_str(&rendered)
    }

    /// Deserialize from `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }
}
