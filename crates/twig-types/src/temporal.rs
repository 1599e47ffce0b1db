use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Largest timezone offset accepted, in minutes (±14:00).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// A point in time as recorded on a commit.
///
/// Stores whole seconds since the UNIX epoch together with the timezone
/// offset (in minutes east of UTC) that was in effect for the author or
/// committer. The offset does not change the instant, only its rendering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the UNIX epoch.
    pub seconds: i64,
    /// Timezone offset in minutes east of UTC.
    pub offset_minutes: i32,
}

impl Timestamp {
    /// Create a timestamp, validating the offset.
    pub fn new(seconds: i64, offset_minutes: i32) -> Result<Self, TypeError> {
        if offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(TypeError::InvalidTimezone(format!(
                "{offset_minutes} minutes is outside ±{MAX_OFFSET_MINUTES}"
            )));
        }
        Ok(Self {
            seconds,
            offset_minutes,
        })
    }

    /// A UTC timestamp at `seconds`.
    pub const fn utc(seconds: i64) -> Self {
        Self {
            seconds,
            offset_minutes: 0,
        }
    }

    /// The current wall-clock time in UTC.
    pub fn now_utc() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        Self::utc(seconds)
    }

    /// Same instant, rendered in a different timezone.
    pub fn with_offset(self, offset_minutes: i32) -> Result<Self, TypeError> {
        Self::new(self.seconds, offset_minutes)
    }

    /// Parse a `+HHMM` / `-HHMM` timezone string into minutes.
    pub fn parse_offset(s: &str) -> Result<i32, TypeError> {
        let invalid = || TypeError::InvalidTimezone(s.to_string());
        let (sign, digits) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
        let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }
        let total = sign * (hours * 60 + minutes);
        Self::new(0, total).map(|_| total)
    }

    /// The offset formatted as `+HHMM` / `-HHMM`.
    pub fn offset_string(&self) -> String {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.abs();
        format!("{sign}{:02}{:02}", abs / 60, abs % 60)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seconds, self.offset_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_seconds_and_offset() {
        let ts = Timestamp::new(1_700_000_000, 120).unwrap();
        assert_eq!(ts.to_string(), "1700000000 +0200");
        let ts = Timestamp::new(5, -330).unwrap();
        assert_eq!(ts.to_string(), "5 -0530");
    }

    #[test]
    fn utc_has_zero_offset() {
        let ts = Timestamp::utc(42);
        assert_eq!(ts.offset_minutes, 0);
        assert_eq!(ts.offset_string(), "+0000");
    }

    #[test]
    fn now_is_after_2020() {
        let ts = Timestamp::now_utc();
        assert!(ts.seconds > 1_577_836_800);
        assert_eq!(ts.offset_minutes, 0);
    }

    #[test]
    fn reject_out_of_range_offset() {
        assert!(Timestamp::new(0, 15 * 60).is_err());
        assert!(Timestamp::utc(0).with_offset(-15 * 60).is_err());
    }

    #[test]
    fn parse_offset_strings() {
        assert_eq!(Timestamp::parse_offset("+0000").unwrap(), 0);
        assert_eq!(Timestamp::parse_offset("+0130").unwrap(), 90);
        assert_eq!(Timestamp::parse_offset("-0800").unwrap(), -480);
        assert!(Timestamp::parse_offset("0800").is_err());
        assert!(Timestamp::parse_offset("+8").is_err());
        assert!(Timestamp::parse_offset("+0860").is_err());
        assert!(Timestamp::parse_offset("+2000").is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let ts = Timestamp::new(1234, -60).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
