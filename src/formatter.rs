use std::collections::HashMap;

use core::cmp::Ordering;

use log::warn;

use crate::pattern::Pattern;
use crate::unit::gcd;
use crate::{BuildError, Duration, Error, UnitDuration, MICROSECOND};

/// Decimal scale applied when a rational unit does not divide the
/// remaining magnitude exactly: fifteen digits of precision.
const PRECISION: i128 = 1_000_000_000_000_000;

/// A configured span parser and formatter.
///
/// A formatter pairs a registry of named units, each with its length
/// in microseconds, with an ordered list of the units used when
/// rendering spans back to text. The [default](crate::default_formatter)
/// instance covers the usual English names; build your own for
/// anything else:
///
/// ```
/// use timespan::{Formatter, UnitDuration};
///
/// let formatter = Formatter::builder()
///     .unit(1_000_000, &["s", "sec", ""])
///     .unit(60_000_000, &["m", "min"])
///     .format_units(&["s", "m"])
///     .build()?;
///
/// assert_eq!(formatter.parse_micros("2m 30")?, 150_000_000);
/// assert_eq!(formatter.format_micros(150_000_000, 1, "0")?, "2m 30s");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Formatter {
    durations: HashMap<String, UnitDuration>,
    pattern: Pattern,
    format_units: Vec<(String, UnitDuration)>,
}

impl Formatter {
    /// A builder for assembling a formatter one unit at a time.
    pub fn builder() -> Builder {
        Builder {
            units: Vec::new(),
            format_units: None,
        }
    }

    /// Builds a formatter from `(name, length)` unit definitions and
    /// the names of the units used for formatting.
    ///
    /// Every length must be positive and finite, every name unique,
    /// and every format unit must name a registered unit. Format units
    /// may come in any order; they are sorted widest first, and equal
    /// lengths keep their given order.
    pub fn new(
        units: &[(&str, UnitDuration)],
        format_units: &[&str],
    ) -> Result<Self, BuildError> {
        Self::from_parts(
            units.iter().map(|(n, d)| ((*n).to_string(), *d)).collect(),
            format_units.iter().map(|n| (*n).to_string()).collect(),
        )
    }

    fn from_parts(
        units: Vec<(String, UnitDuration)>,
        format_units: Vec<String>,
    ) -> Result<Self, BuildError> {
        let mut durations = HashMap::with_capacity(units.len());
        for (name, duration) in units {
            let duration = duration.normalized(&name)?;
            if durations.insert(name.clone(), duration).is_some() {
                return Err(BuildError::DuplicateUnit(name));
            }
        }

        let mut resolved = Vec::with_capacity(format_units.len());
        for name in format_units {
            let duration = *durations
                .get(&name)
                .ok_or_else(|| BuildError::UnknownFormatUnit(name.clone()))?;
            resolved.push((name, duration));
        }
        resolved.sort_by(|a, b| b.1.length_cmp(&a.1));

        if let Some(smallest) = durations.values().min_by(|a, b| a.length_cmp(b)) {
            if smallest.length_cmp(&UnitDuration::Micros(MICROSECOND)) == Ordering::Greater {
                warn!("smallest unit is longer than one microsecond, parsed spans may lose precision");
            }
        }
        if resolved
            .iter()
            .any(|(_, d)| matches!(d, UnitDuration::Ratio { .. }))
        {
            warn!("formatting with a non-integral unit may truncate");
        }

        let pattern = Pattern::new(durations.keys().map(String::as_str));

        Ok(Self {
            durations,
            pattern,
            format_units: resolved,
        })
    }

    /// Parses a span string.
    pub fn parse(&self, text: &str) -> Result<Duration, Error> {
        self.parse_micros(text).map(Duration::from_micros)
    }

    /// Parses a span string to a whole number of microseconds.
    ///
    /// The input is a run of `<sign?><digits><unit-name>` tokens with
    /// optional whitespace between them, such as `"1h 30m"` or
    /// `"-10s"`. Tokens accumulate, so `"1s 1s"` is two seconds, and
    /// each carries its own sign. A bare numeral is read in the unit
    /// registered under the empty name. An empty or whitespace-only
    /// string is zero.
    ///
    /// Fractions left over by rational units are summed exactly and
    /// truncated toward zero once, after the last token.
    pub fn parse_micros(&self, text: &str) -> Result<i64, Error> {
        let text = text.trim();
        let mut total: i128 = 0;
        let mut carry = (0i128, 1i128);
        let mut pos = 0;

        while pos < text.len() {
            let (token, next) = self
                .pattern
                .token_at(text, pos)
                .ok_or_else(|| Error::invalid_character(text, pos))?;
            let count: i64 = token.numeral.parse().map_err(|_| Error::Overflow)?;
            let (num, den) = self.durations[token.unit].parts();
            let product = count as i128 * num as i128;
            if den == 1 {
                total = total.checked_add(product).ok_or(Error::Overflow)?;
            } else {
                let den = den as i128;
                total = total
                    .checked_add(product / den)
                    .ok_or(Error::Overflow)?;
                carry = fold_carry(carry, product % den, den)?;
            }
            pos = next;
        }

        let (carry_num, carry_den) = carry;
        if carry_num != 0 {
            total = total
                .checked_add(carry_num / carry_den)
                .ok_or(Error::Overflow)?;
        }

        i64::try_from(total).map_err(|_| Error::Overflow)
    }

    /// Formats a span, emitting no unit shorter than `resolution`
    /// microseconds and the `zero` text when nothing is emitted.
    pub fn format(&self, span: Duration, resolution: i64, zero: &str) -> Result<String, Error> {
        self.format_micros(span.as_micros(), resolution, zero)
    }

    /// Formats a whole number of microseconds as a span string.
    ///
    /// The walk is greedy, widest format unit first: each unit takes
    /// the largest whole count it can and the remainder flows onward.
    /// Units longer than the remaining magnitude are skipped, and the
    /// walk stops once the remainder drops below `resolution`. A span
    /// that produces no counts at all, zero included, renders as the
    /// `zero` text. Negative spans carry the sign on every emitted
    /// count, so the output parses back to the same value.
    pub fn format_micros(&self, us: i64, resolution: i64, zero: &str) -> Result<String, Error> {
        if self.format_units.is_empty() {
            return Err(Error::NoFormatUnits);
        }

        let negative = us < 0;
        let resolution = resolution as i128;
        let mut rem = us.unsigned_abs() as i128;
        let mut scale_rem: i128 = 0;
        let mut parts: Vec<String> = Vec::new();

        for (name, duration) in &self.format_units {
            if rem < resolution {
                break;
            }
            let (num, den) = duration.parts();
            let (num, den) = (num as i128, den as i128);
            if rem * den < num {
                continue;
            }
            let count = if den == 1 {
                let n = rem / num;
                rem %= num;
                n
            } else {
                // rem * den = n * num + rest; the unit divides rem
                // exactly only when den divides rest
                let scaled = rem * den;
                let n = scaled / num;
                let rest = scaled % num;
                if rest % den == 0 {
                    rem = rest / den;
                    n
                } else {
                    let (n, whole, sub) = scaled_div(rem, scale_rem, num, den);
                    rem = whole;
                    scale_rem = sub;
                    n
                }
            };
            let count = if negative { -count } else { count };
            parts.push(format!("{count}{name}"));
        }

        if parts.is_empty() {
            Ok(zero.to_string())
        } else {
            Ok(parts.join(" "))
        }
    }
}

/// Adds `frac / den` to the running fractional carry, kept in lowest
/// terms so repeated rational tokens cannot widen the denominator
/// without bound.
fn fold_carry(
    (carry_num, carry_den): (i128, i128),
    frac: i128,
    den: i128,
) -> Result<(i128, i128), Error> {
    let num = carry_num
        .checked_mul(den)
        .and_then(|v| v.checked_add(frac.checked_mul(carry_den)?))
        .ok_or(Error::Overflow)?;
    let den = carry_den.checked_mul(den).ok_or(Error::Overflow)?;
    let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i128;
    Ok((num / g, den / g))
}

/// Fixed-precision decomposition for a rational unit that does not
/// divide the remaining magnitude exactly. Unit and remainder are both
/// scaled by `PRECISION`; the count, the whole microseconds left, and
/// the sub-microsecond part (carried into the next unit) come back
/// separately. The products stay within `i128` for any 64-bit inputs.
fn scaled_div(rem: i128, scale_rem: i128, num: i128, den: i128) -> (i128, i128, i128) {
    // a unit shorter than one quantum divides as one quantum
    let unit = (num * PRECISION / den).max(1);
    let scaled = rem * PRECISION + scale_rem;
    let n = scaled / unit;
    let rest = scaled % unit;
    (n, rest / PRECISION, rest % PRECISION)
}

/// Incrementally assembles a [`Formatter`].
///
/// Nothing is validated until [`build`](Builder::build) runs, so units
/// may be registered in any order.
pub struct Builder {
    units: Vec<(UnitDuration, Vec<String>)>,
    format_units: Option<Vec<String>>,
}

impl Builder {
    /// Registers one unit length under each of `names`.
    pub fn unit(mut self, duration: impl Into<UnitDuration>, names: &[&str]) -> Self {
        let names = names.iter().map(|n| (*n).to_string()).collect();
        self.units.push((duration.into(), names));
        self
    }

    /// Sets the units used for formatting, by registered name.
    ///
    /// Without this call, the first name from each [`unit`](Self::unit)
    /// call becomes a format unit, in registration order. An explicit
    /// empty list builds a parse-only formatter.
    pub fn format_units(mut self, names: &[&str]) -> Self {
        self.format_units = Some(names.iter().map(|n| (*n).to_string()).collect());
        self
    }

    /// Validates the configuration and builds the formatter.
    pub fn build(self) -> Result<Formatter, BuildError> {
        let format_units = match self.format_units {
            Some(names) => names,
            None => self
                .units
                .iter()
                .filter_map(|(_, names)| names.first().cloned())
                .collect(),
        };
        let units = self
            .units
            .into_iter()
            .flat_map(|(duration, names)| names.into_iter().map(move |name| (name, duration)))
            .collect();
        Formatter::from_parts(units, format_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractional(num: i64, den: i64) -> Formatter {
        Formatter::builder()
            .unit(UnitDuration::from_ratio(num, den), &["x"])
            .unit(1, &["u", ""])
            .format_units(&["x", "u"])
            .build()
            .unwrap()
    }

    #[test]
    fn build_rejects_bad_lengths() {
        assert_eq!(
            Formatter::new(&[("s", UnitDuration::from_micros(0))], &[]).unwrap_err(),
            BuildError::NonPositiveUnit("s".to_string())
        );
        assert_eq!(
            Formatter::new(&[("s", UnitDuration::from_micros(-1))], &[]).unwrap_err(),
            BuildError::NonPositiveUnit("s".to_string())
        );
        assert_eq!(
            Formatter::new(&[("s", UnitDuration::from_ratio(1, 0))], &[]).unwrap_err(),
            BuildError::NonFiniteUnit("s".to_string())
        );
    }

    #[test]
    fn build_rejects_repeats_and_unknowns() {
        let units = [
            ("s", UnitDuration::from_micros(1_000_000)),
            ("s", UnitDuration::from_micros(1)),
        ];
        assert_eq!(
            Formatter::new(&units, &[]).unwrap_err(),
            BuildError::DuplicateUnit("s".to_string())
        );
        assert_eq!(
            Formatter::new(&[("s", UnitDuration::from_micros(1))], &["m"]).unwrap_err(),
            BuildError::UnknownFormatUnit("m".to_string())
        );
    }

    #[test]
    fn builder_repeats_across_calls() {
        let result = Formatter::builder()
            .unit(1, &["u"])
            .unit(2, &["u"])
            .build();
        assert_eq!(
            result.unwrap_err(),
            BuildError::DuplicateUnit("u".to_string())
        );
    }

    #[test]
    fn builder_defaults_format_units_to_first_aliases() {
        let formatter = Formatter::builder()
            .unit(60, &["m", "min"])
            .unit(1, &["u", ""])
            .build()
            .unwrap();
        assert_eq!(formatter.format_micros(61, 1, "0").unwrap(), "1m 1u");
        assert_eq!(formatter.parse_micros("1min 1").unwrap(), 61);

        // an explicit empty list builds a parse-only formatter
        let parse_only = Formatter::builder()
            .unit(1, &["u"])
            .format_units(&[])
            .build()
            .unwrap();
        assert_eq!(
            parse_only.format_micros(1, 1, "0"),
            Err(Error::NoFormatUnits)
        );
    }

    #[test]
    fn no_format_units() {
        let formatter = Formatter::new(&[("s", UnitDuration::from_micros(1_000_000))], &[])
            .unwrap();
        assert_eq!(
            formatter.format_micros(5, 1, "0"),
            Err(Error::NoFormatUnits)
        );
        // parsing is unaffected
        assert_eq!(formatter.parse_micros("3s"), Ok(3_000_000));
    }

    #[test]
    fn format_units_sort_widest_first() {
        let formatter = Formatter::builder()
            .unit(1, &["u"])
            .unit(60, &["m"])
            .unit(3600, &["h"])
            .format_units(&["u", "h", "m"])
            .build()
            .unwrap();
        assert_eq!(formatter.format_micros(3661, 1, "0").unwrap(), "1h 1m 1u");
    }

    #[test]
    fn parse_truncates_fractions_once() {
        let formatter = fractional(3, 2);
        assert_eq!(formatter.parse_micros("1x").unwrap(), 1);
        assert_eq!(formatter.parse_micros("3x").unwrap(), 4);
        assert_eq!(formatter.parse_micros("-3x").unwrap(), -4);
        // three halves of carry survive until the end: 3 * 1.5 = 4.5
        assert_eq!(formatter.parse_micros("1x 1x 1x").unwrap(), 4);
        assert_eq!(formatter.parse_micros("1x -1x").unwrap(), 0);
        assert_eq!(formatter.parse_micros("5x 1u").unwrap(), 8);
    }

    #[test]
    fn format_exact_ratio() {
        let formatter = fractional(3, 2);
        assert_eq!(formatter.format_micros(7, 1, "0").unwrap(), "4x 1u");
        assert_eq!(formatter.format_micros(-7, 1, "0").unwrap(), "-4x -1u");
        assert_eq!(formatter.format_micros(3, 1, "0").unwrap(), "2x");
    }

    #[test]
    fn format_large_exact_ratio() {
        let formatter = fractional(3, 2);
        // 3^35 is divisible by 3, so 3^35 / 1.5 is exact
        let base: i64 = 50_031_545_098_999_707;
        assert_eq!(
            formatter.format_micros(base, 1, "0").unwrap(),
            "33354363399333138x"
        );
        assert_eq!(
            formatter.format_micros(base + 1, 1, "0").unwrap(),
            "33354363399333138x 1u"
        );
        assert_eq!(
            formatter.format_micros(base + 2, 1, "0").unwrap(),
            "33354363399333139x"
        );
        assert_eq!(
            formatter.format_micros(base + 3, 1, "0").unwrap(),
            "33354363399333140x"
        );
        assert_eq!(
            formatter.format_micros(base + 4, 1, "0").unwrap(),
            "33354363399333140x 1u"
        );
    }

    #[test]
    fn format_wide_ratio_falls_back() {
        // the exact ratio of the float 1.1 has a 2^51 denominator, so
        // almost every magnitude takes the fixed-precision path
        let ratio = UnitDuration::from_f64(1.1).unwrap();
        let formatter = Formatter::builder()
            .unit(ratio, &["x"])
            .unit(1, &["u"])
            .format_units(&["x", "u"])
            .build()
            .unwrap();
        assert_eq!(formatter.format_micros(10, 1, "0").unwrap(), "9x");
        assert_eq!(formatter.format_micros(11, 1, "0").unwrap(), "10x");
        assert_eq!(formatter.format_micros(12, 1, "0").unwrap(), "10x 1u");
        assert_eq!(formatter.format_micros(13, 1, "0").unwrap(), "11x");
    }

    #[test]
    fn format_large_wide_ratio() {
        let ratio = UnitDuration::from_f64(1.1).unwrap();
        let formatter = Formatter::builder()
            .unit(ratio, &["x"])
            .unit(1, &["u"])
            .format_units(&["x", "u"])
            .build()
            .unwrap();
        // 3^35 microseconds, far past the point where a float product
        // would round
        let base: i64 = 50_031_545_098_999_707;
        assert_eq!(
            formatter.format_micros(base, 1, "0").unwrap(),
            "45483222817272460x 1u"
        );
        assert_eq!(
            formatter.format_micros(base + 1, 1, "0").unwrap(),
            "45483222817272461x"
        );
        assert_eq!(
            formatter.format_micros(base - 1, 1, "0").unwrap(),
            "45483222817272460x"
        );
        // the rational product stays exact on the way back in
        assert_eq!(
            formatter.parse_micros("45483222817272460x 1u").unwrap(),
            50_031_545_098_999_711
        );
    }

    #[test]
    fn construction_order_is_irrelevant() {
        let units = [
            ("u", UnitDuration::from_micros(1)),
            ("m", UnitDuration::from_micros(60)),
            ("h", UnitDuration::from_micros(3600)),
        ];
        let mut reversed = units;
        reversed.reverse();
        let a = Formatter::new(&units, &["h", "m", "u"]).unwrap();
        let b = Formatter::new(&reversed, &["h", "m", "u"]).unwrap();
        for us in [0, 1, 61, 3661, 7322] {
            assert_eq!(
                a.format_micros(us, 1, "0").unwrap(),
                b.format_micros(us, 1, "0").unwrap()
            );
        }
        assert_eq!(a.parse_micros("1h 1m 1u"), b.parse_micros("1h 1m 1u"));
    }

    #[test]
    fn resolution_stops_the_walk() {
        let formatter = fractional(3, 2);
        assert_eq!(formatter.format_micros(0, 1, "0").unwrap(), "0");
        assert_eq!(formatter.format_micros(1, 2, "none").unwrap(), "none");
        assert_eq!(formatter.format_micros(-1, 2, "none").unwrap(), "none");
    }

    #[test]
    fn parse_overflow() {
        let formatter = fractional(3, 2);
        assert_eq!(
            formatter.parse_micros("99999999999999999999u"),
            Err(Error::Overflow)
        );
        assert_eq!(
            formatter.parse_micros("9223372036854775807u 1u"),
            Err(Error::Overflow)
        );
        // i64::MIN itself still fits
        assert_eq!(
            formatter.parse_micros("-9223372036854775808u"),
            Ok(i64::MIN)
        );
    }

    #[test]
    fn format_full_range() {
        let formatter = Formatter::builder()
            .unit(1, &["u", ""])
            .format_units(&["u"])
            .build()
            .unwrap();
        assert_eq!(
            formatter.format_micros(i64::MIN, 1, "0").unwrap(),
            "-9223372036854775808u"
        );
        assert_eq!(
            formatter.parse_micros("-9223372036854775808u").unwrap(),
            i64::MIN
        );
        assert_eq!(
            formatter.format_micros(i64::MAX, 1, "0").unwrap(),
            "9223372036854775807u"
        );
    }

    #[test]
    fn fractional_unit_drops_sub_resolution_remainder() {
        // i64::MIN is not divisible by 3, so the 1.5µs unit takes the
        // fixed-precision path and half a microsecond stays behind
        let formatter = fractional(3, 2);
        assert_eq!(
            formatter.format_micros(i64::MIN, 1, "0").unwrap(),
            "-6148914691236517205x"
        );
        assert_eq!(
            formatter.parse_micros("-6148914691236517205x").unwrap(),
            i64::MIN + 1
        );
    }
}
