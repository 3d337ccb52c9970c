use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

/// Instant normalized to UTC.
///
/// Parsing accepts RFC 3339 and ISO 8601 with any offset and converts it, so
/// `08:00+02:00` and `06:00Z` compare equal. A space may stand in for the
/// `T` separator. Timestamps without an offset are local civil time; see
/// [`UtcDateTime::parse_with_local_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses a timestamp, reading one without an offset as UTC.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Self::parse_with_local_offset(input, |_| UtcOffset::UTC)
    }

    /// Parses a timestamp, reading one without an offset as local civil
    /// time at the offset `local_offset` reports for that instant.
    pub fn parse_with_local_offset<F>(input: &str, local_offset: F) -> Result<Self, ValidationError>
    where
        F: Fn(UtcDateTime) -> UtcOffset,
    {
        let invalid = || ValidationError::InvalidTimestamp {
            value: input.to_owned(),
        };
        let normalized = normalize_separator(input.trim());

        if let Ok(parsed) = OffsetDateTime::parse(&normalized, &Rfc3339)
            .or_else(|_| OffsetDateTime::parse(&normalized, &Iso8601::DEFAULT))
        {
            return Self::checked_from(parsed).ok_or_else(invalid);
        }

        let naive = PrimitiveDateTime::parse(&normalized, &Iso8601::DEFAULT).map_err(|_| invalid())?;
        // The offset is looked up twice so that a guess taken at the UTC
        // reading is corrected across a DST change.
        let guess = local_offset(Self(naive.assume_utc()));
        let offset = Self::checked_from(naive.assume_offset(guess))
            .map_or(guess, |first| local_offset(first));
        Self::checked_from(naive.assume_offset(offset)).ok_or_else(invalid)
    }

    fn checked_from(value: OffsetDateTime) -> Option<Self> {
        value.checked_to_offset(UtcOffset::UTC).map(Self)
    }

    /// Builds an instant from epoch seconds; `None` when out of range.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp(seconds).ok().map(Self)
    }

    /// `self + duration`, or `None` outside the representable range.
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        self.0.checked_add(duration).map(Self)
    }

    pub fn unix_seconds(self) -> i64 {
        self.0.unix_timestamp()
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Civil hour (0..=23) of this instant at the given offset.
    pub fn hour_at(self, offset: UtcOffset) -> u8 {
        self.0.to_offset(offset).hour()
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.0.unix_timestamp().to_string())
    }
}

/// `2024-01-01 08:00` reads as `2024-01-01T08:00`.
fn normalize_separator(input: &str) -> String {
    match input.as_bytes().get(10) {
        Some(b' ') => format!("{}T{}", &input[..10], input[11..].trim_start()),
        _ => input.to_owned(),
    }
}

impl Add<Duration> for UtcDateTime {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<Duration> for UtcDateTime {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl Sub for UtcDateTime {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
