//! Fixed-precision signed decimal.
//!
//! Values carry exactly [`PRECISION`] fractional digits and are stored as a
//! scaled `i128`. No floating point is involved anywhere, so every replica
//! computes bit-identical results.
//!
//! Products and quotients of two decimals are formed in a 256-bit
//! intermediate and rescaled before narrowing back to `i128`. Weighted sums
//! stay at 256 bits in [`WeightedSum`] until their final division.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use uint::construct_uint;

/// Number of fractional digits.
pub const PRECISION: u32 = 18;

/// 10^18
const SCALE: i128 = 1_000_000_000_000_000_000;

construct_uint! {
    struct U256(4);
}

/// Decimal arithmetic and parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalError {
    #[error("decimal overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid decimal string {0:?}")]
    Invalid(String),

    #[error("decimal {0:?} has more than {PRECISION} fractional digits")]
    Precision(String),
}

/// Signed decimal with 18 fractional digits.
///
/// Range is roughly ±1.7 × 10^20. All arithmetic is checked; results that
/// do not fit return [`DecimalError::Overflow`].
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct Dec(i128);

impl Dec {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(SCALE)
    }

    /// Build from an already-scaled raw value (`raw / 10^18`).
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i128 {
        self.0
    }

    /// `value / 10^decimals`, exact.
    pub fn with_precision(value: i64, decimals: u32) -> Result<Self, DecimalError> {
        if decimals > PRECISION {
            return Err(DecimalError::Precision(format!("{value}e-{decimals}")));
        }
        let factor = 10i128.pow(PRECISION - decimals);
        i128::from(value)
            .checked_mul(factor)
            .map(Self)
            .ok_or(DecimalError::Overflow)
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, DecimalError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(DecimalError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, DecimalError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(DecimalError::Overflow)
    }

    /// `self * rhs`, truncated toward zero at the 18th fractional digit.
    pub fn checked_mul(self, rhs: Self) -> Result<Self, DecimalError> {
        let magnitude = U256::from(self.0.unsigned_abs()) * U256::from(rhs.0.unsigned_abs())
            / U256::from(SCALE as u128);
        narrow(magnitude, (self.0 < 0) != (rhs.0 < 0))
    }

    /// `self / rhs`, truncated toward zero at the 18th fractional digit.
    pub fn checked_quo(self, rhs: Self) -> Result<Self, DecimalError> {
        if rhs.0 == 0 {
            return Err(DecimalError::DivisionByZero);
        }
        let magnitude = U256::from(self.0.unsigned_abs()) * U256::from(SCALE as u128)
            / U256::from(rhs.0.unsigned_abs());
        narrow(magnitude, (self.0 < 0) != (rhs.0 < 0))
    }

    /// `self * rhs` for an integer multiplier. Exact.
    pub fn checked_mul_int(self, rhs: i64) -> Result<Self, DecimalError> {
        self.0
            .checked_mul(i128::from(rhs))
            .map(Self)
            .ok_or(DecimalError::Overflow)
    }

    /// `self / rhs` for an integer divisor, truncated toward zero.
    pub fn checked_quo_int(self, rhs: i64) -> Result<Self, DecimalError> {
        if rhs == 0 {
            return Err(DecimalError::DivisionByZero);
        }
        self.0
            .checked_div(i128::from(rhs))
            .map(Self)
            .ok_or(DecimalError::Overflow)
    }
}

/// Running sum of `Dec * integer` products held at 256 bits.
///
/// Only the final quotient is narrowed back to a [`Dec`], so long windows of
/// large values can be summed without overflowing the `i128` range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeightedSum {
    positive: U256,
    negative: U256,
}

impl WeightedSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value * weight`.
    pub fn add_weighted(&mut self, value: Dec, weight: i64) -> Result<(), DecimalError> {
        let product = U256::from(value.0.unsigned_abs())
            .checked_mul(U256::from(weight.unsigned_abs()))
            .ok_or(DecimalError::Overflow)?;
        let side = if (value.0 < 0) != (weight < 0) {
            &mut self.negative
        } else {
            &mut self.positive
        };
        *side = side.checked_add(product).ok_or(DecimalError::Overflow)?;
        Ok(())
    }

    /// `sum / divisor`, truncated toward zero.
    pub fn checked_quo_int(self, divisor: i64) -> Result<Dec, DecimalError> {
        if divisor == 0 {
            return Err(DecimalError::DivisionByZero);
        }
        let (difference, negative) = if self.positive >= self.negative {
            (self.positive - self.negative, false)
        } else {
            (self.negative - self.positive, true)
        };
        let magnitude = difference / U256::from(divisor.unsigned_abs());
        narrow(magnitude, negative != (divisor < 0))
    }
}

/// Apply `negative` to a 256-bit magnitude and narrow it to `i128`.
fn narrow(magnitude: U256, negative: bool) -> Result<Dec, DecimalError> {
    // i128::MIN has no positive counterpart, so the negative side gets one extra.
    let limit = if negative {
        U256::from(i128::MIN.unsigned_abs())
    } else {
        U256::from(i128::MAX as u128)
    };
    if magnitude > limit {
        return Err(DecimalError::Overflow);
    }
    let small = magnitude.low_u128();
    Ok(Dec(if negative {
        0i128.wrapping_sub_unsigned(small)
    } else {
        small as i128
    }))
}

impl From<i64> for Dec {
    fn from(value: i64) -> Self {
        // |i64| * 10^18 < 2^127, cannot overflow.
        Self(i128::from(value) * SCALE)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        let scale = SCALE as u128;
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}{}.{:018}",
            magnitude / scale,
            magnitude % scale
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({self})")
    }
}

impl FromStr for Dec {
    type Err = DecimalError;

    /// Accepts `[-]digits[.digits]` with at most 18 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecimalError::Invalid(s.to_string());

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => {
                if frac_part.is_empty() {
                    return Err(invalid());
                }
                (int_part, frac_part)
            }
            None => (body, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac_part.len() > PRECISION as usize {
            return Err(DecimalError::Precision(s.to_string()));
        }

        let mut raw: i128 = 0;
        for digit in int_part.bytes() {
            raw = raw
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(digit - b'0')))
                .ok_or(DecimalError::Overflow)?;
        }
        raw = raw.checked_mul(SCALE).ok_or(DecimalError::Overflow)?;

        let mut frac: i128 = 0;
        for digit in frac_part.bytes() {
            frac = frac * 10 + i128::from(digit - b'0');
        }
        frac *= 10i128.pow(PRECISION - frac_part.len() as u32);
        raw = raw.checked_add(frac).ok_or(DecimalError::Overflow)?;

        Ok(Self(if negative { -raw } else { raw }))
    }
}
