//! Signed decimal numbers with an arbitrary base-10 exponent.
//!
//! A [`Fractional`] is the pair `(m, exp)` with logical value `m * 10^-exp`. Exact arithmetic
//! (addition, subtraction, multiplication) always returns the canonical form, where trailing
//! zeros of the mantissa have been folded into the exponent. Division, square roots and
//! significant-figure rounding go through `f64` and are lossy by contract.
use borsh::{BorshDeserialize, BorshSerialize};
use bytemuck::{Pod, Zeroable};
use solana_program::msg;
use std::{cmp::Ordering, convert::TryFrom, fmt::Display, str::FromStr};

use crate::error::{AoError, AoResult};

/// The maximum number of fractional digits rendered when displaying a value
pub const MAX_PRECISION: u64 = 10;
/// Number of decimal places kept by [`Fractional::checked_div`]
pub const DIVISION_PRECISION: u32 = 6;
/// Number of decimal places kept by [`Fractional::sqrt`]
pub const SQRT_PRECISION: u32 = 2;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, BorshSerialize, BorshDeserialize, Pod, Zeroable)]
/// A fixed point decimal number, serialized as an `i64` mantissa followed by a `u64` exponent
pub struct Fractional {
    /// The signed mantissa
    pub m: i64,
    /// The number of decimal places
    pub exp: u64,
}

/// The canonical zero
pub const ZERO_FRAC: Fractional = Fractional { m: 0, exp: 0 };

impl Fractional {
    /// Serialized size in bytes
    pub const LEN: usize = std::mem::size_of::<Self>();
    /// Positive infinity sentinel, displayed as `Inf`
    pub const INF: Self = Fractional { m: i64::MAX, exp: 0 };
    /// Negative infinity sentinel, displayed as `-Inf`
    pub const NEG_INF: Self = Fractional { m: i64::MIN, exp: 0 };

    /// Builds `m * 10^-exp` without normalizing it
    pub const fn new(m: i64, exp: u64) -> Self {
        Self { m, exp }
    }

    /// Encodes `round(x * 10^scale)` at exponent `scale`
    pub fn from_f64(x: f64, scale: u32) -> AoResult<Self> {
        let scaled = (x * pow10_f64(scale as u64)).round();
        Ok(Self {
            m: f64_to_i64(scaled)?,
            exp: scale as u64,
        })
    }

    /// Encodes an unsigned quantity such as a tick price or a base quantity
    pub fn from_u64(x: u64) -> AoResult<Self> {
        let m = i64::try_from(x).map_err(|_| AoError::NumericOverflow)?;
        Ok(Self { m, exp: 0 })
    }

    /// Finds the smallest exponent which represents the shortest decimal rendering of `x` exactly
    pub fn to_decimal(x: f64) -> AoResult<Self> {
        if x.is_nan() {
            msg!("Cannot encode NaN as a Fractional");
            return Err(AoError::NotANumber);
        }
        if x.is_infinite() {
            return Ok(if x > 0.0 { Self::INF } else { Self::NEG_INF });
        }
        format!("{}", x).parse()
    }

    /// Returns the canonical form: zero is `(0, 0)` and the mantissa carries no trailing zero
    /// unless the exponent is already zero
    #[must_use]
    pub fn simplify(&self) -> Self {
        if self.m == 0 {
            return ZERO_FRAC;
        }
        let mut m = self.m;
        let mut exp = self.exp;
        while m % 10 == 0 && exp > 0 {
            m /= 10;
            exp -= 1;
        }
        Self { m, exp }
    }

    /// True when the value is in the form returned by [`Fractional::simplify`]
    pub fn is_canonical(&self) -> bool {
        if self.m == 0 {
            return self.exp == 0;
        }
        self.m % 10 != 0 || self.exp == 0
    }

    #[allow(missing_docs)]
    pub fn is_infinite(&self) -> bool {
        (self.m == i64::MAX || self.m == i64::MIN) && self.exp == 0
    }

    #[allow(missing_docs)]
    pub fn is_negative(&self) -> bool {
        self.m < 0
    }

    /// Fails with `NumericOverflow` on `i64::MIN` mantissas
    pub fn abs(&self) -> AoResult<Self> {
        let m = self.m.checked_abs().ok_or(AoError::NumericOverflow)?;
        Ok(Self { m, exp: self.exp })
    }

    /// The logical value as a float
    pub fn value(&self) -> f64 {
        self.m as f64 / pow10_f64(self.exp)
    }

    /// Adds at the larger of the two exponents, then simplifies
    pub fn checked_add(&self, other: impl Into<Fractional>) -> AoResult<Self> {
        let lhs = self.simplify();
        let rhs = other.into().simplify();
        let exp = std::cmp::max(lhs.exp, rhs.exp);
        let m = rescale(lhs.m, exp - lhs.exp)?
            .checked_add(rescale(rhs.m, exp - rhs.exp)?)
            .ok_or(AoError::NumericOverflow)?;
        Ok(Self { m, exp }.simplify())
    }

    #[allow(missing_docs)]
    pub fn checked_sub(&self, other: impl Into<Fractional>) -> AoResult<Self> {
        let other = other.into();
        let negated = Self {
            m: other.m.checked_neg().ok_or(AoError::NumericOverflow)?,
            exp: other.exp,
        };
        self.checked_add(negated)
    }

    /// Multiplies the mantissas and sums the exponents, failing when the product does not fit
    pub fn checked_mul(&self, other: impl Into<Fractional>) -> AoResult<Self> {
        let lhs = self.simplify();
        let rhs = other.into().simplify();
        if lhs.m == 0 || rhs.m == 0 {
            return Ok(ZERO_FRAC);
        }
        let mut m = lhs.m as i128 * rhs.m as i128;
        let mut exp = lhs.exp.checked_add(rhs.exp).ok_or(AoError::NumericOverflow)?;
        while m % 10 == 0 && exp > 0 {
            m /= 10;
            exp -= 1;
        }
        let m = i64::try_from(m).map_err(|_| AoError::NumericOverflow)?;
        Ok(Self { m, exp })
    }

    /// Approximate division, rounded to [`DIVISION_PRECISION`] decimal places.
    ///
    /// Dividing a non-zero value by zero yields the matching infinity sentinel.
    pub fn checked_div(&self, other: impl Into<Fractional>) -> AoResult<Self> {
        let other = other.into();
        if other.m == 0 {
            return match self.m.signum() {
                1 => Ok(Self::INF),
                -1 => Ok(Self::NEG_INF),
                _ => {
                    msg!("Attempted to divide zero by zero");
                    Err(AoError::NotANumber)
                }
            };
        }
        Self::to_decimal(round_f64(self.value() / other.value(), DIVISION_PRECISION))
    }

    /// Approximate square root, rounded to [`SQRT_PRECISION`] decimal places
    pub fn sqrt(&self) -> AoResult<Self> {
        if self.is_negative() {
            msg!("Attempted to take the square root of a negative number");
            return Err(AoError::NotANumber);
        }
        Self::to_decimal(round_f64(self.value().sqrt(), SQRT_PRECISION))
    }

    /// Rounds the value to `digits` decimal places
    pub fn round_sf(&self, digits: u32) -> AoResult<Self> {
        Self::to_decimal(round_f64(self.value(), digits))
    }
}

fn pow10_f64(exp: u64) -> f64 {
    10f64.powi(std::cmp::min(exp, i32::MAX as u64) as i32)
}

fn round_f64(x: f64, digits: u32) -> f64 {
    let factor = pow10_f64(digits as u64);
    (x * factor).round() / factor
}

fn f64_to_i64(x: f64) -> AoResult<i64> {
    if x.is_nan() {
        return Err(AoError::NotANumber);
    }
    // i64::MAX is not representable: the nearest float is 2^63
    if x >= i64::MAX as f64 || x < i64::MIN as f64 {
        return Err(AoError::NumericOverflow);
    }
    Ok(x as i64)
}

fn rescale(m: i64, exp_diff: u64) -> AoResult<i64> {
    if m == 0 || exp_diff == 0 {
        return Ok(m);
    }
    let exp_diff = u32::try_from(exp_diff).map_err(|_| AoError::NumericOverflow)?;
    10i64
        .checked_pow(exp_diff)
        .and_then(|factor| m.checked_mul(factor))
        .ok_or(AoError::NumericOverflow)
}

impl From<i64> for Fractional {
    fn from(x: i64) -> Self {
        Fractional::new(x, 0)
    }
}

impl PartialEq for Fractional {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fractional {}

impl PartialOrd for Fractional {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fractional {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.simplify();
        let rhs = other.simplify();
        let sign_ordering = lhs.m.signum().cmp(&rhs.m.signum());
        if sign_ordering != Ordering::Equal || lhs.m == 0 {
            return sign_ordering;
        }
        let scale = |m: i64, exp_diff: u64| {
            10i128
                .checked_pow(u32::try_from(exp_diff).ok()?)?
                .checked_mul(m as i128)
        };
        // Both sides share a sign. A scaled mantissa which no longer fits has a larger magnitude.
        if lhs.exp <= rhs.exp {
            match scale(lhs.m, rhs.exp - lhs.exp) {
                Some(scaled) => scaled.cmp(&(rhs.m as i128)),
                None => lhs.m.signum().cmp(&0),
            }
        } else {
            match scale(rhs.m, lhs.exp - rhs.exp) {
                Some(scaled) => (lhs.m as i128).cmp(&scaled),
                None => 0.cmp(&rhs.m.signum()),
            }
        }
    }
}

impl Display for Fractional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.m == Self::INF.m && self.exp == Self::INF.exp {
            return write!(f, "Inf");
        }
        if self.m == Self::NEG_INF.m && self.exp == Self::NEG_INF.exp {
            return write!(f, "-Inf");
        }
        let mut m = self.m as i128;
        let mut exp = self.exp;
        if exp > MAX_PRECISION {
            let shift = exp - MAX_PRECISION;
            // |m| < 10^19, anything shifted further rounds to zero
            m = if shift > 19 {
                0
            } else {
                let divisor = 10i128.pow(shift as u32);
                let (quotient, remainder) = (m / divisor, m % divisor);
                if remainder.abs() * 2 >= divisor {
                    quotient + m.signum()
                } else {
                    quotient
                }
            };
            exp = MAX_PRECISION;
        }
        let base = 10i128.pow(exp as u32);
        let sign = if m < 0 { "-" } else { "" };
        let int_part = m.abs() / base;
        let frac_part = m.abs() % base;
        if frac_part == 0 {
            return write!(f, "{}{}", sign, int_part);
        }
        let frac_digits = format!("{:0width$}", frac_part, width = exp as usize);
        write!(
            f,
            "{}{}.{}",
            sign,
            int_part,
            frac_digits.trim_end_matches('0')
        )
    }
}

impl FromStr for Fractional {
    type Err = AoError;

    fn from_str(s: &str) -> AoResult<Fractional> {
        let s = s.trim();
        match s {
            "Inf" => return Ok(Self::INF),
            "-Inf" => return Ok(Self::NEG_INF),
            _ => {}
        }
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let is_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
        {
            msg!("Invalid decimal string: {}", s);
            return Err(AoError::InvalidDecimal);
        }
        let frac_part = frac_part.trim_end_matches('0');
        let mut m: i128 = 0;
        for digit in int_part.bytes().chain(frac_part.bytes()) {
            m = m * 10 + (digit - b'0') as i128;
            if m > i64::MAX as i128 + 1 {
                return Err(AoError::NumericOverflow);
            }
        }
        if negative {
            m = -m;
        }
        let m = i64::try_from(m).map_err(|_| AoError::NumericOverflow)?;
        Ok(Fractional {
            m,
            exp: frac_part.len() as u64,
        }
        .simplify())
    }
}
