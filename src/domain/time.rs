//! Nanosecond epoch timestamps as carried on the wire.
//!
//! Every date field travels as a signed 64-bit count of nanoseconds since the
//! Unix epoch. Display code always divides by [`NANOS_PER_MILLI`] first and
//! builds calendar values from whole milliseconds, so two clients rendering the
//! same record agree on the calendar day.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

/// Conversion factor between wire nanoseconds and display milliseconds.
pub const NANOS_PER_MILLI: i64 = 1_000_000;

const FORM_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Build a timestamp from whole milliseconds, saturating on overflow.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI))
    }

    /// Whole milliseconds, truncated toward zero.
    pub const fn to_millis(self) -> i64 {
        self.0 / NANOS_PER_MILLI
    }

    /// Current wall clock at millisecond precision.
    pub fn now() -> Self {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let millis = nanos / i128::from(NANOS_PER_MILLI);
        Self::from_millis(i64::try_from(millis).unwrap_or(i64::MAX))
    }

    /// Midnight UTC of the given calendar day.
    pub fn from_date(date: Date) -> Self {
        let seconds = date.midnight().assume_utc().unix_timestamp();
        Self::from_millis(seconds.saturating_mul(1_000))
    }

    /// Parse a `YYYY-MM-DD` form value into midnight UTC of that day.
    pub fn parse_date(input: &str) -> Result<Self, DomainError> {
        let date = Date::parse(input.trim(), FORM_DATE_FORMAT)
            .map_err(|err| DomainError::validation(format!("invalid date `{input}`: {err}")))?;
        Ok(Self::from_date(date))
    }

    /// UTC date-time built from the millisecond projection.
    pub fn to_datetime(self) -> Result<OffsetDateTime, DomainError> {
        let nanos = i128::from(self.to_millis()) * i128::from(NANOS_PER_MILLI);
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|err| DomainError::validation(format!("timestamp out of range: {err}")))
    }

    pub fn calendar_date(self) -> Result<Date, DomainError> {
        self.to_datetime().map(OffsetDateTime::date)
    }

    /// `YYYY-MM-DD`, the value an edit form is pre-filled with.
    pub fn form_value(self) -> Result<String, DomainError> {
        let date = self.calendar_date()?;
        date.format(FORM_DATE_FORMAT)
            .map_err(|err| DomainError::validation(format!("failed to format date: {err}")))
    }
}
