//! Parsing and formatting of human-readable time spans.
//!
//! A span string is a run of signed counts with unit names, such as
//! `"1h 30m"` or `"2d 12h"` or `"-10s"`. This crate converts between
//! such strings and [`Duration`], a signed microsecond count, in both
//! directions: parsing accumulates every token into one value, and
//! formatting decomposes a value greedily from the widest unit down.
//!
//! The [`parse`] and [`format`] functions use a built-in registry of
//! the common English unit names:
//!
//! ```
//! use timespan::{format, parse, Duration};
//!
//! let span = parse("1h 30m")?;
//! assert_eq!(span, Duration::from_mins(90));
//! assert_eq!(format(span), "1h 30m");
//! assert_eq!(format(parse("90m")? + parse("30s")?), "1h 30m 30s");
//! # Ok::<(), timespan::Error>(())
//! ```
//!
//! Custom unit tables, including fractional unit lengths, go through
//! [`Formatter::builder`]. Unit lengths are held as exact integer
//! ratios, so parsing and formatting never drift through floating
//! point; see [`UnitDuration`].

mod duration;
mod error;
mod formatter;
mod pattern;
mod unit;

pub use duration::Duration;
pub use error::{BuildError, Error};
pub use formatter::{Builder, Formatter};
pub use unit::UnitDuration;

use std::sync::OnceLock;

/// One microsecond.
pub const MICROSECOND: i64 = 1;
/// Microseconds in one millisecond.
pub const MILLISECOND: i64 = 1_000;
/// Microseconds in one second.
pub const SECOND: i64 = 1_000_000;
/// Microseconds in one minute.
pub const MINUTE: i64 = 60 * SECOND;
/// Microseconds in one hour.
pub const HOUR: i64 = 60 * MINUTE;
/// Microseconds in one day.
pub const DAY: i64 = 24 * HOUR;
/// Microseconds in one week.
pub const WEEK: i64 = 7 * DAY;
/// Microseconds in one year of 365.25 days.
pub const YEAR: i64 = 365 * DAY + DAY / 4;
/// Microseconds in one month, exactly a twelfth of a year.
pub const MONTH: i64 = YEAR / 12;

static DEFAULT: OnceLock<Formatter> = OnceLock::new();

/// The process-wide formatter behind [`parse`], [`format`], and the
/// `Display` and `FromStr` impls on [`Duration`].
///
/// It registers `us`, `ms`, `s`, `m`, `h`, `d`, `w`, `M`, and `y`,
/// each with its usual longhand aliases, and reads a bare numeral as
/// seconds. Formatting uses `us ms s m h d M y`, so weeks render as
/// days and months only appear for spans of a month or more.
pub fn default_formatter() -> &'static Formatter {
    DEFAULT.get_or_init(|| {
        Formatter::builder()
            .unit(MICROSECOND, &["us", "usec", "microseconds"])
            .unit(MILLISECOND, &["ms", "msec", "msecs", "milliseconds"])
            .unit(SECOND, &["s", "sec", "secs", "second", "seconds", ""])
            .unit(MINUTE, &["m", "min", "mins", "minute", "minutes"])
            .unit(HOUR, &["h", "hr", "hrs", "hour", "hours"])
            .unit(DAY, &["d", "day", "days"])
            .unit(WEEK, &["w", "week", "weeks"])
            .unit(MONTH, &["M", "month", "months"])
            .unit(YEAR, &["y", "yr", "yrs", "year", "years"])
            .format_units(&["us", "ms", "s", "m", "h", "d", "M", "y"])
            .build()
            .expect("default units are valid")
    })
}

/// Parses a span string with the [default formatter](default_formatter).
pub fn parse(text: &str) -> Result<Duration, Error> {
    default_formatter().parse(text)
}

/// Formats a span with the [default formatter](default_formatter) at
/// one millisecond resolution, rendering sub-millisecond spans as
/// `"0"`.
pub fn format(span: Duration) -> String {
    default_formatter()
        .format(span, MILLISECOND, "0")
        .expect("the default formatter has format units")
}
