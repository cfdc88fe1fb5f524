//! XMP Date/Time utilities
//!
//! XMP dates use an ISO 8601 subset that allows partial values (year only,
//! year and month, date without time) and an optional time zone. Values are
//! compared by absolute instant, not field by field.

use crate::core::error::{XmpError, XmpResult};
use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Timelike, Utc,
};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// XMP Date/Time structure
///
/// A value with none of the date, time or time zone parts set is the "zero"
/// date; it is distinct from every calendar date, including `0000-01-01`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XmpDateTime {
    /// Year (0..=9999)
    pub year: i32,
    /// Month (1-12, 0 means not set)
    pub month: u8,
    /// Day (1-31, 0 means not set)
    pub day: u8,
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
    /// Nanoseconds (0-999999999)
    pub nanosecond: u32,
    /// Whether date components are present
    pub has_date: bool,
    /// Whether time components are present
    pub has_time: bool,
    /// Whether timezone is present
    pub has_timezone: bool,
    /// Timezone sign: -1 (west), 0 (UTC), +1 (east)
    pub tz_sign: i8,
    /// Timezone hour offset (0-23)
    pub tz_hour: u8,
    /// Timezone minute offset (0-59)
    pub tz_minute: u8,
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Scanner<'_> {
    fn done(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8, what: &str) -> XmpResult<()> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(XmpError::BadValue(format!(
                "Invalid date string, expected '{}' {}",
                b as char, what
            )))
        }
    }

    /// Read a run of digits, returning its value and length
    fn number(&mut self, what: &str) -> XmpResult<(u64, usize)> {
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .ok_or_else(|| XmpError::BadValue(format!("{} is too large", what)))?;
            self.pos += 1;
        }
        if self.pos == start {
            return Err(XmpError::BadValue(format!("Invalid {} in date string", what)));
        }
        Ok((value, self.pos - start))
    }

    fn field(&mut self, what: &str, max: u64) -> XmpResult<u8> {
        let (value, _) = self.number(what)?;
        if value > max {
            return Err(XmpError::BadValue(format!("{} is out of range", what)));
        }
        Ok(value as u8)
    }
}

impl XmpDateTime {
    /// Create a new zero date/time
    pub fn new() -> Self {
        Self::default()
    }

    /// The current local date and time, with its time zone
    pub fn current() -> Self {
        Local::now().fixed_offset().into()
    }

    /// Whether no date, time or time zone part is set
    pub fn is_zero(&self) -> bool {
        !self.has_date && !self.has_time && !self.has_timezone
    }

    /// Parse an XMP date/time string
    ///
    /// XMP date/time format:
    /// - `YYYY`, `YYYY-MM`, `YYYY-MM-DD`
    /// - `YYYY-MM-DDThh:mm`, `YYYY-MM-DDThh:mm:ss`, `YYYY-MM-DDThh:mm:ss.sss`
    /// - any form with a time may end in `Z` or `+hh:mm` / `-hh:mm`
    /// - `Thh:mm...` for a time without a date
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::utils::datetime::XmpDateTime;
    ///
    /// let dt = XmpDateTime::parse("2023-12-25T10:30:00Z").unwrap();
    /// assert_eq!(dt.year, 2023);
    /// assert_eq!(dt.month, 12);
    /// assert_eq!(dt.day, 25);
    /// ```
    pub fn parse(s: &str) -> XmpResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(XmpError::BadValue("Empty date/time string".to_string()));
        }

        let mut dt = Self::new();
        let mut sc = Scanner {
            bytes: s.as_bytes(),
            pos: 0,
        };

        if !sc.eat(b'T') {
            dt.has_date = true;
            let (year, digits) = sc.number("year")?;
            if digits > 4 || year > 9999 {
                return Err(XmpError::BadValue("Year is out of range".to_string()));
            }
            dt.year = year as i32;

            if sc.eat(b'-') {
                dt.month = sc.field("month", 12)?;
                if dt.month == 0 {
                    return Err(XmpError::BadValue("Month is out of range".to_string()));
                }
                if sc.eat(b'-') {
                    dt.day = sc.field("day", 31)?;
                    if dt.day == 0 {
                        return Err(XmpError::BadValue("Day is out of range".to_string()));
                    }
                }
            }

            if sc.done() {
                return Ok(dt);
            }
            if dt.day == 0 {
                return Err(XmpError::BadValue(
                    "A time requires a full date".to_string(),
                ));
            }
            sc.expect(b'T', "before the time")?;
        }

        dt.has_time = true;
        dt.hour = sc.field("hour", 23)?;
        sc.expect(b':', "after the hour")?;
        dt.minute = sc.field("minute", 59)?;

        if sc.eat(b':') {
            dt.second = sc.field("second", 59)?;
            if sc.eat(b'.') {
                let (mut frac, digits) = sc.number("fractional second")?;
                if digits > 9 {
                    frac /= 10u64.pow((digits - 9) as u32);
                } else {
                    frac *= 10u64.pow((9 - digits) as u32);
                }
                dt.nanosecond = frac as u32;
            }
        }

        if sc.eat(b'Z') {
            dt.has_timezone = true;
        } else if let Some(sign @ (b'+' | b'-')) = sc.peek() {
            sc.pos += 1;
            dt.has_timezone = true;
            dt.tz_sign = if sign == b'+' { 1 } else { -1 };
            dt.tz_hour = sc.field("timezone hour", 23)?;
            sc.expect(b':', "after the timezone hour")?;
            dt.tz_minute = sc.field("timezone minute", 59)?;
            if dt.tz_hour == 0 && dt.tz_minute == 0 {
                dt.tz_sign = 0;
            }
        }

        if !sc.done() {
            return Err(XmpError::BadValue(
                "Invalid date string, extra characters at end".to_string(),
            ));
        }

        Ok(dt)
    }

    /// Format an XMP date/time to string
    ///
    /// Fractional seconds are written without trailing zeros.
    pub fn format(&self) -> String {
        let mut result = String::new();

        if self.has_date {
            if self.month == 0 {
                result.push_str(&format!("{:04}", self.year));
            } else if self.day == 0 {
                result.push_str(&format!("{:04}-{:02}", self.year, self.month));
            } else {
                result.push_str(&format!(
                    "{:04}-{:02}-{:02}",
                    self.year, self.month, self.day
                ));
            }
        }

        if self.has_time {
            result.push('T');
            result.push_str(&format!(
                "{:02}:{:02}:{:02}",
                self.hour, self.minute, self.second
            ));
            if self.nanosecond != 0 {
                let fraction = format!("{:09}", self.nanosecond);
                result.push('.');
                result.push_str(fraction.trim_end_matches('0'));
            }

            if self.has_timezone {
                if self.tz_sign == 0 {
                    result.push('Z');
                } else {
                    let sign = if self.tz_sign < 0 { '-' } else { '+' };
                    result.push_str(&format!(
                        "{}{:02}:{:02}",
                        sign, self.tz_hour, self.tz_minute
                    ));
                }
            }
        }

        result
    }

    /// Validate the date/time values
    pub fn validate(&self) -> XmpResult<()> {
        if self.has_date {
            if !(0..=9999).contains(&self.year) {
                return Err(XmpError::BadValue("Year is out of range".to_string()));
            }
            if self.month > 12 {
                return Err(XmpError::BadValue("Month is out of range".to_string()));
            }
            if self.day > 31 {
                return Err(XmpError::BadValue("Day is out of range".to_string()));
            }
        }

        if self.has_time {
            if self.hour > 23 {
                return Err(XmpError::BadValue("Hour is out of range".to_string()));
            }
            if self.minute > 59 {
                return Err(XmpError::BadValue("Minute is out of range".to_string()));
            }
            if self.second > 59 {
                return Err(XmpError::BadValue("Second is out of range".to_string()));
            }
            if self.nanosecond >= 1_000_000_000 {
                return Err(XmpError::BadValue("Nanosecond is out of range".to_string()));
            }
        }

        if self.has_timezone {
            if self.tz_hour > 23 || self.tz_minute > 59 {
                return Err(XmpError::BadValue(
                    "Timezone offset is out of range".to_string(),
                ));
            }
            if self.tz_sign == 0 && (self.tz_hour != 0 || self.tz_minute != 0) {
                return Err(XmpError::BadValue(
                    "UTC timezone must have zero hour and minute".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Time zone offset in seconds east of UTC (0 when absent)
    pub fn offset_seconds(&self) -> i32 {
        let magnitude = i32::from(self.tz_hour) * 3600 + i32::from(self.tz_minute) * 60;
        i32::from(self.tz_sign.signum()) * magnitude
    }

    fn fixed_offset(&self) -> XmpResult<FixedOffset> {
        FixedOffset::east_opt(self.offset_seconds())
            .ok_or_else(|| XmpError::BadValue("Timezone offset is out of range".to_string()))
    }

    fn naive(&self) -> XmpResult<NaiveDateTime> {
        let date = if self.has_date {
            NaiveDate::from_ymd_opt(
                self.year,
                u32::from(self.month.max(1)),
                u32::from(self.day.max(1)),
            )
        } else {
            NaiveDate::from_ymd_opt(0, 1, 1)
        }
        .ok_or_else(|| XmpError::BadValue(format!("Invalid calendar date {}", self.format())))?;
        let time = NaiveTime::from_hms_nano_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
            self.nanosecond,
        )
        .ok_or_else(|| XmpError::BadValue(format!("Invalid time {}", self.format())))?;
        Ok(date.and_time(time))
    }

    /// Convert to a `chrono` date-time. Missing parts default to the start
    /// of their period and a missing time zone is taken as UTC.
    pub fn to_chrono(&self) -> XmpResult<DateTime<FixedOffset>> {
        let offset = self.fixed_offset()?;
        offset
            .from_local_datetime(&self.naive()?)
            .single()
            .ok_or_else(|| XmpError::BadValue("Ambiguous local time".to_string()))
    }

    /// Compare two values by the instant they denote
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.to_chrono(), other.to_chrono()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => self.format().cmp(&other.format()),
        }
    }

    fn assign_instant(&mut self, instant: DateTime<FixedOffset>) {
        let has_date = self.has_date;
        *self = instant.into();
        self.has_date = has_date;
    }

    /// Shift a value with a time and a time zone to UTC
    pub fn convert_to_utc(&mut self) -> XmpResult<()> {
        if !self.has_time || !self.has_timezone || self.offset_seconds() == 0 {
            self.tz_sign = 0;
            self.tz_hour = 0;
            self.tz_minute = 0;
            return Ok(());
        }
        let utc = self.to_chrono()?.with_timezone(&Utc).fixed_offset();
        self.assign_instant(utc);
        Ok(())
    }

    /// Shift a value with a time and a time zone to the local time zone.
    /// Values without a time zone are already local and stay unchanged.
    pub fn convert_to_local_time(&mut self) -> XmpResult<()> {
        if !self.has_time || !self.has_timezone {
            return Ok(());
        }
        let local = self.to_chrono()?.with_timezone(&Local).fixed_offset();
        self.assign_instant(local);
        Ok(())
    }

    /// Attach the local time zone to a value that has none, keeping its
    /// clock fields.
    pub fn set_local_time_zone(&mut self) -> XmpResult<()> {
        if self.has_timezone {
            return Err(XmpError::BadParam(
                "Value already has a time zone".to_string(),
            ));
        }
        let naive = self.naive()?;
        let offset = Local
            .offset_from_local_datetime(&naive)
            .earliest()
            .map(|o| o.fix())
            .unwrap_or_else(|| Local::now().offset().fix());
        self.set_offset_seconds(offset.local_minus_utc());
        self.has_time = true;
        Ok(())
    }

    fn set_offset_seconds(&mut self, seconds: i32) {
        self.has_timezone = true;
        self.tz_sign = seconds.signum() as i8;
        let magnitude = seconds.unsigned_abs();
        self.tz_hour = (magnitude / 3600) as u8;
        self.tz_minute = ((magnitude % 3600) / 60) as u8;
    }
}

impl From<DateTime<FixedOffset>> for XmpDateTime {
    fn from(value: DateTime<FixedOffset>) -> Self {
        let mut dt = Self {
            year: value.year(),
            month: value.month() as u8,
            day: value.day() as u8,
            hour: value.hour() as u8,
            minute: value.minute() as u8,
            second: value.second().min(59) as u8,
            nanosecond: value.nanosecond() % 1_000_000_000,
            has_date: true,
            has_time: true,
            ..Self::default()
        };
        dt.set_offset_seconds(value.offset().local_minus_utc());
        dt
    }
}

impl FromStr for XmpDateTime {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for XmpDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_only() {
        let dt = XmpDateTime::parse("2023").unwrap();
        assert_eq!(dt.year, 2023);
        assert_eq!(dt.month, 0);
        assert!(dt.has_date);
        assert!(!dt.has_time);
    }

    #[test]
    fn test_parse_full_date() {
        let dt = XmpDateTime::parse("2023-12-25").unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2023, 12, 25));
        assert!(!dt.has_time);
    }

    #[test]
    fn test_parse_date_time() {
        let dt = XmpDateTime::parse("2023-12-25T10:30").unwrap();
        assert_eq!((dt.hour, dt.minute, dt.second), (10, 30, 0));
        assert!(dt.has_time);
        assert!(!dt.has_timezone);
    }

    #[test]
    fn test_parse_with_timezone() {
        let dt = XmpDateTime::parse("2023-12-25T10:30:00Z").unwrap();
        assert!(dt.has_timezone);
        assert_eq!(dt.tz_sign, 0);

        let dt = XmpDateTime::parse("2023-12-25T10:30:00-08:30").unwrap();
        assert_eq!((dt.tz_sign, dt.tz_hour, dt.tz_minute), (-1, 8, 30));
        assert_eq!(dt.offset_seconds(), -(8 * 3600 + 30 * 60));
    }

    #[test]
    fn test_parse_with_fractional_seconds() {
        let dt = XmpDateTime::parse("2023-12-25T10:30:00.123Z").unwrap();
        assert_eq!(dt.nanosecond, 123_000_000);
        let dt = XmpDateTime::parse("2023-12-25T10:30:00.1234567891Z").unwrap();
        assert_eq!(dt.nanosecond, 123_456_789);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "", "abc", "2023-13", "2023-00-01", "2023-12-32", "10000", "2023-12-25T25:00",
            "2023-12-25T10:61", "2023-12-25T10:30:00+08", "2023-12-25T10:30:00Q", "2023T10:30",
        ] {
            assert!(
                matches!(XmpDateTime::parse(bad), Err(XmpError::BadValue(_))),
                "{:?} should fail",
                bad
            );
        }
    }

    #[test]
    fn test_round_trip() {
        for text in [
            "2023",
            "2023-12",
            "2023-12-25",
            "2023-12-25T10:30:00",
            "2023-12-25T10:30:00Z",
            "2023-12-25T10:30:00+08:00",
            "2023-12-25T10:30:00.123Z",
            "T08:15:00",
        ] {
            let dt: XmpDateTime = text.parse().unwrap();
            assert_eq!(dt.format(), text);
        }
    }

    #[test]
    fn test_zero_is_distinct() {
        let zero = XmpDateTime::new();
        assert!(zero.is_zero());
        let epoch = XmpDateTime::parse("0000-01-01").unwrap();
        assert!(!epoch.is_zero());
        assert_ne!(zero, epoch);
    }

    #[test]
    fn test_compare_by_instant() {
        let a = XmpDateTime::parse("2023-12-25T10:00:00+02:00").unwrap();
        let b = XmpDateTime::parse("2023-12-25T08:00:00Z").unwrap();
        let c = XmpDateTime::parse("2023-12-25T09:00:00Z").unwrap();
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert_ne!(a, b);
        assert_eq!(a.compare(&c), Ordering::Less);
        // Lexically larger but earlier
        let d = XmpDateTime::parse("2023-12-25T22:00:00+14:00").unwrap();
        assert_eq!(d.compare(&c), Ordering::Less);
    }

    #[test]
    fn test_convert_to_utc_crosses_midnight() {
        let mut dt = XmpDateTime::parse("2024-03-01T01:30:00+05:00").unwrap();
        dt.convert_to_utc().unwrap();
        assert_eq!(dt.format(), "2024-02-29T20:30:00Z");
    }

    #[test]
    fn test_chrono_conversion() {
        let dt = XmpDateTime::parse("2021-06-01T12:00:00.5-04:00").unwrap();
        let chrono = dt.to_chrono().unwrap();
        assert_eq!(chrono.offset().local_minus_utc(), -4 * 3600);
        let back: XmpDateTime = chrono.into();
        assert_eq!(back, dt);
    }

    #[test]
    fn test_set_local_time_zone() {
        let mut dt = XmpDateTime::parse("2021-06-01T12:00:00").unwrap();
        dt.set_local_time_zone().unwrap();
        assert!(dt.has_timezone);
        assert_eq!(dt.hour, 12);
        assert!(dt.set_local_time_zone().is_err());
    }

    #[test]
    fn test_current_and_local_round_trip() {
        let now = XmpDateTime::current();
        assert!(now.has_date && now.has_time && now.has_timezone);
        let mut shifted = now.clone();
        shifted.convert_to_utc().unwrap();
        shifted.convert_to_local_time().unwrap();
        assert_eq!(shifted.compare(&now), Ordering::Equal);
    }
}
