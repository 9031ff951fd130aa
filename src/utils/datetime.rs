//! XMP Date/Time values
//!
//! XMP dates are a profile of ISO 8601 that allows partial values: a year, a
//! year and month, a full date, or a date with time, optional fractional
//! seconds and an optional time zone.

use crate::core::error::{XmpError, XmpResult};
use crate::model::Text;
use std::fmt;
use std::str::FromStr;

/// XMP Date/Time structure
///
/// Represents a date/time value with optional components. A value with
/// neither date nor time is the empty date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmpDateTime {
    /// Year (can be negative for BCE dates)
    pub year: i32,
    /// Month (1-12, 0 means not set)
    pub month: u8,
    /// Day (1-31, 0 means not set)
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Nanoseconds (0-999999999)
    pub nanosecond: u32,
    pub has_date: bool,
    pub has_time: bool,
    pub has_timezone: bool,
    /// Timezone sign: -1 (west), 0 (UTC), +1 (east)
    pub tz_sign: i8,
    pub tz_hour: u8,
    pub tz_minute: u8,
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
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
            Err(bad(self.input, &format!("expected '{}' {}", b as char, what)))
        }
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn number<T: FromStr>(&mut self, what: &str) -> XmpResult<T> {
        let digits = self.digits();
        if digits.is_empty() {
            return Err(bad(self.input, &format!("missing {}", what)));
        }
        digits
            .parse()
            .map_err(|_| bad(self.input, &format!("invalid {}", what)))
    }

    fn done(&self) -> bool {
        self.pos >= self.input.len()
    }
}

fn bad(input: &str, reason: &str) -> XmpError {
    XmpError::BadValue(format!("date '{}': {}", input, reason))
}

impl XmpDateTime {
    /// Create a new empty XMP date/time
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether neither date nor time is set
    pub fn is_zero(&self) -> bool {
        !self.has_date && !self.has_time
    }

    /// Parse an XMP date/time string
    ///
    /// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DDThh:mm`,
    /// `YYYY-MM-DDThh:mm:ss[.fff]` followed by an optional `Z` or `+hh:mm`,
    /// and time-only values such as `T10:30:00`. Out-of-range month, day,
    /// hour, minute and second components are clamped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpdoc::XmpDateTime;
    ///
    /// let dt = XmpDateTime::parse("2023-12-25T10:30:00Z").unwrap();
    /// assert_eq!(dt.year, 2023);
    /// assert_eq!(dt.month, 12);
    /// assert_eq!(dt.day, 25);
    /// assert_eq!(dt.to_string(), "2023-12-25T10:30:00Z");
    /// ```
    pub fn parse(s: &str) -> XmpResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(XmpError::BadValue("Empty date/time string".to_string()));
        }
        let mut dt = Self::new();
        let mut sc = Scanner { input: s, pos: 0 };
        let bytes = s.as_bytes();
        let time_only = bytes[0] == b'T' || bytes.get(1) == Some(&b':') || bytes.get(2) == Some(&b':');

        if !time_only {
            dt.has_date = true;
            let negative = sc.eat(b'-');
            let year: i32 = sc.number("year")?;
            dt.year = if negative { -year } else { year };
            if sc.done() {
                return Ok(dt);
            }
            sc.expect(b'-', "after year")?;
            dt.month = sc.number::<u8>("month")?.clamp(1, 12);
            if sc.done() {
                return Ok(dt);
            }
            sc.expect(b'-', "after month")?;
            dt.day = sc.number::<u8>("day")?.clamp(1, 31);
            if sc.done() {
                return Ok(dt);
            }
            sc.expect(b'T', "before time")?;
        } else {
            sc.eat(b'T');
        }

        dt.has_time = true;
        dt.hour = sc.number::<u8>("hour")?.min(23);
        sc.expect(b':', "after hour")?;
        dt.minute = sc.number::<u8>("minute")?.min(59);
        if sc.eat(b':') {
            dt.second = sc.number::<u8>("second")?.min(59);
            if sc.eat(b'.') {
                let frac = sc.digits();
                // keep at most nanosecond precision
                let frac = &frac[..frac.len().min(9)];
                if !frac.is_empty() {
                    let value: u32 = frac
                        .parse()
                        .map_err(|_| bad(s, "invalid fractional second"))?;
                    dt.nanosecond = value * 10u32.pow(9 - frac.len() as u32);
                }
                sc.digits();
            }
        }
        if sc.done() {
            return Ok(dt);
        }

        dt.has_timezone = true;
        match sc.peek() {
            Some(b'Z') => {
                sc.pos += 1;
            }
            Some(sign @ (b'+' | b'-')) => {
                sc.pos += 1;
                dt.tz_sign = if sign == b'+' { 1 } else { -1 };
                dt.tz_hour = sc.number("timezone hour")?;
                sc.expect(b':', "after timezone hour")?;
                dt.tz_minute = sc.number("timezone minute")?;
                if dt.tz_hour > 23 || dt.tz_minute > 59 {
                    return Err(bad(s, "timezone out of range"));
                }
            }
            _ => return Err(bad(s, "invalid timezone")),
        }
        if !sc.done() {
            return Err(bad(s, "extra characters at end"));
        }
        Ok(dt)
    }

    /// Format to the shortest XMP form that holds all set components
    pub fn format(&self) -> String {
        let mut out = String::new();
        if self.has_date {
            out.push_str(&format!("{:04}", self.year));
            if self.month != 0 {
                out.push_str(&format!("-{:02}", self.month));
                if self.day != 0 {
                    out.push_str(&format!("-{:02}", self.day));
                }
            }
        }
        if self.has_time {
            if self.has_date {
                out.push('T');
            }
            out.push_str(&format!(
                "{:02}:{:02}:{:02}",
                self.hour, self.minute, self.second
            ));
            if self.nanosecond != 0 {
                let frac = format!("{:09}", self.nanosecond);
                out.push('.');
                out.push_str(frac.trim_end_matches('0'));
            }
        }
        if self.has_timezone {
            if self.tz_sign == 0 {
                out.push('Z');
            } else {
                let sign = if self.tz_sign < 0 { '-' } else { '+' };
                out.push_str(&format!("{}{:02}:{:02}", sign, self.tz_hour, self.tz_minute));
            }
        }
        out
    }

    /// Check that all components are within range
    pub fn validate(&self) -> XmpResult<()> {
        let s = self.format();
        if self.has_date && (self.month > 12 || self.day > 31) {
            return Err(bad(&s, "date out of range"));
        }
        if self.has_time
            && (self.hour > 23 || self.minute > 59 || self.second > 59 || self.nanosecond >= 1_000_000_000)
        {
            return Err(bad(&s, "time out of range"));
        }
        if self.has_timezone
            && (self.tz_hour > 23
                || self.tz_minute > 59
                || (self.tz_sign == 0 && (self.tz_hour != 0 || self.tz_minute != 0)))
        {
            return Err(bad(&s, "timezone out of range"));
        }
        Ok(())
    }
}

impl fmt::Display for XmpDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for XmpDateTime {
    type Err = XmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        XmpDateTime::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Serialize for XmpDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.format())
    }
}

impl Text for XmpDateTime {
    fn to_text(&self) -> String {
        self.format()
    }

    fn set_text(&mut self, text: &str) -> XmpResult<()> {
        *self = if text.trim().is_empty() {
            XmpDateTime::new()
        } else {
            XmpDateTime::parse(text)?
        };
        Ok(())
    }
}
