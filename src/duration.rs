use core::fmt;
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use core::str::FromStr;

use crate::{default_formatter, Error, DAY, HOUR, MICROSECOND, MILLISECOND, MINUTE, SECOND, WEEK};

/// A signed span of time, stored as a whole number of microseconds in
/// an `i64`.
///
/// `Display` and [`FromStr`] go through the
/// [default formatter](crate::default_formatter): a span displays as
/// text like `"1h 30m"` down to microsecond resolution, and parses
/// back from it losslessly.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    us: i64,
}

impl Duration {
    /// A span of zero length.
    pub const ZERO: Self = Self { us: 0 };

    /// A span of whole microseconds.
    pub const fn from_micros(us: i64) -> Self {
        Self { us }
    }

    /// A span of whole milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self {
            us: millis * MILLISECOND,
        }
    }

    /// A span of whole seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self { us: secs * SECOND }
    }

    /// A span of whole minutes.
    pub const fn from_mins(mins: i64) -> Self {
        Self { us: mins * MINUTE }
    }

    /// A span of whole hours.
    pub const fn from_hours(hours: i64) -> Self {
        Self { us: hours * HOUR }
    }

    /// A span of whole days.
    pub const fn from_days(days: i64) -> Self {
        Self { us: days * DAY }
    }

    /// A span of whole weeks.
    pub const fn from_weeks(weeks: i64) -> Self {
        Self { us: weeks * WEEK }
    }

    /// The whole number of microseconds in the span.
    pub const fn as_micros(&self) -> i64 {
        self.us
    }

    /// The span in seconds, as a float.
    pub fn as_secs_f64(&self) -> f64 {
        self.us as f64 / SECOND as f64
    }

    /// `true` for a zero-length span.
    pub const fn is_zero(&self) -> bool {
        self.us == 0
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            us: self.us + rhs.us,
        }
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.us += rhs.us;
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            us: self.us - rhs.us,
        }
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        self.us -= rhs.us;
    }
}

impl Neg for Duration {
    type Output = Self;

    fn neg(self) -> Self {
        Self { us: -self.us }
    }
}

impl Mul<i64> for Duration {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Self { us: self.us * rhs }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = default_formatter()
            .format(*self, MICROSECOND, "0")
            .map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        default_formatter().parse(s)
    }
}

impl TryFrom<core::time::Duration> for Duration {
    type Error = Error;

    fn try_from(value: core::time::Duration) -> Result<Self, Error> {
        i64::try_from(value.as_micros())
            .map(Self::from_micros)
            .map_err(|_| Error::Overflow)
    }
}

impl TryFrom<Duration> for core::time::Duration {
    type Error = Error;

    fn try_from(value: Duration) -> Result<Self, Error> {
        u64::try_from(value.us)
            .map(core::time::Duration::from_micros)
            .map_err(|_| Error::Overflow)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Duration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Duration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        use serde::de;

        struct DurationVisitor;

        impl<'de> de::Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a time span string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(DurationVisitor)
    }
}
