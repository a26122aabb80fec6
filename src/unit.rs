use core::cmp::Ordering;

use crate::BuildError;

/// The length of one named unit, expressed in microseconds.
///
/// A length is either a whole number of microseconds or an exact ratio
/// of two integers, so fractional units such as 1.5µs never go through
/// floating point during parsing or formatting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnitDuration {
    /// A whole number of microseconds.
    Micros(i64),
    /// `num / den` microseconds.
    Ratio { num: i64, den: i64 },
}

impl UnitDuration {
    /// A length of `us` whole microseconds.
    pub const fn from_micros(us: i64) -> Self {
        Self::Micros(us)
    }

    /// A length of `num / den` microseconds.
    pub const fn from_ratio(num: i64, den: i64) -> Self {
        Self::Ratio { num, den }
    }

    /// Converts a float to the exact ratio it encodes, by way of its
    /// binary mantissa and exponent. A float holding a mathematical
    /// integer becomes [`Micros`](Self::Micros), so `from_f64(2.0)` is
    /// the same length as `from_micros(2)`.
    ///
    /// Returns `None` for values that are not positive finite numbers,
    /// or whose exact ratio does not fit in 64-bit terms.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let bits = value.to_bits();
        let raw_exponent = ((bits >> 52) & 0x7ff) as i32;
        let fraction = bits & ((1u64 << 52) - 1);
        let (mut mantissa, mut exponent) = if raw_exponent == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), raw_exponent - 1075)
        };
        // move factors of two out of the mantissa
        if exponent < 0 {
            let shift = mantissa.trailing_zeros().min((-exponent) as u32);
            mantissa >>= shift;
            exponent += shift as i32;
        }
        if exponent >= 0 {
            if exponent > 62 {
                return None;
            }
            let num = (mantissa as u128) << exponent;
            if num > i64::MAX as u128 {
                return None;
            }
            Some(Self::Micros(num as i64))
        } else {
            if exponent < -62 {
                return None;
            }
            // the mantissa is odd here, so the ratio is in lowest terms
            Some(Self::Ratio {
                num: mantissa as i64,
                den: 1i64 << (-exponent),
            })
        }
    }

    /// Numerator and denominator, with `Micros` read as a ratio over
    /// one.
    pub(crate) const fn parts(&self) -> (i64, i64) {
        match *self {
            Self::Micros(us) => (us, 1),
            Self::Ratio { num, den } => (num, den),
        }
    }

    /// Ordering by length. This is deliberately not an `Ord` impl:
    /// structurally distinct values such as `Micros(2)` and
    /// `Ratio { num: 4, den: 2 }` compare equal here.
    pub(crate) fn length_cmp(&self, other: &Self) -> Ordering {
        let (an, ad) = self.parts();
        let (bn, bd) = other.parts();
        (an as i128 * bd as i128).cmp(&(bn as i128 * ad as i128))
    }

    /// Validates the length registered for `unit` and brings ratios to
    /// lowest terms, collapsing integral ratios into `Micros`.
    pub(crate) fn normalized(self, unit: &str) -> Result<Self, BuildError> {
        match self {
            Self::Micros(us) if us > 0 => Ok(self),
            Self::Micros(_) => Err(BuildError::NonPositiveUnit(unit.to_string())),
            Self::Ratio { den: 0, .. } => Err(BuildError::NonFiniteUnit(unit.to_string())),
            Self::Ratio { num, den } => {
                let mut num = num as i128;
                let mut den = den as i128;
                if den < 0 {
                    num = -num;
                    den = -den;
                }
                if num <= 0 {
                    return Err(BuildError::NonPositiveUnit(unit.to_string()));
                }
                let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as i128;
                num /= g;
                den /= g;
                if num > i64::MAX as i128 || den > i64::MAX as i128 {
                    return Err(BuildError::UnrepresentableUnit(unit.to_string()));
                }
                if den == 1 {
                    Ok(Self::Micros(num as i64))
                } else {
                    Ok(Self::Ratio {
                        num: num as i64,
                        den: den as i64,
                    })
                }
            }
        }
    }
}

impl From<i64> for UnitDuration {
    fn from(us: i64) -> Self {
        Self::Micros(us)
    }
}

pub(crate) fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}
