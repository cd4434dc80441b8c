//! Exact rational arithmetic for every monetary and price quantity.
//!
//! Floating point only appears where a statistic needs a square root; ledger
//! and clock values stay exact and are rounded to [`Decimal`] at the export
//! boundary.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;

use super::error::StratbenchError;

/// Fractional digits used when exporting exact values.
pub const DISPLAY_DIGITS: u32 = 4;

/// Largest decimal exponent accepted when parsing scientific notation.
pub const MAX_EXPONENT: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Exact(BigRational);

impl Exact {
    pub fn zero() -> Self {
        Exact(BigRational::zero())
    }

    pub fn one() -> Self {
        Exact(BigRational::one())
    }

    /// `numer / denom`, failing on a zero denominator.
    pub fn ratio(numer: i64, denom: i64) -> Result<Self, StratbenchError> {
        if denom == 0 {
            return Err(StratbenchError::DivisionByZero);
        }
        Ok(Exact(BigRational::new(BigInt::from(numer), BigInt::from(denom))))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn abs(&self) -> Self {
        Exact(self.0.abs())
    }

    pub fn checked_div(&self, rhs: &Exact) -> Result<Exact, StratbenchError> {
        if rhs.0.is_zero() {
            return Err(StratbenchError::DivisionByZero);
        }
        Ok(Exact(&self.0 / &rhs.0))
    }

    /// Round half away from zero to `digits` fractional digits.
    pub fn to_display(&self, digits: u32) -> Result<Decimal, StratbenchError> {
        let scale = pow10(digits);
        let scaled = (&self.0 * BigRational::from_integer(scale)).round().to_integer();
        let mantissa = scaled
            .to_i128()
            .ok_or_else(|| StratbenchError::ValueOutOfRange {
                reason: format!("{self} does not fit a decimal with {digits} digits"),
            })?;
        Decimal::try_from_i128_with_scale(mantissa, digits).map_err(|e| {
            StratbenchError::ValueOutOfRange {
                reason: format!("{self}: {e}"),
            }
        })
    }

    /// Nearest `f64`, for statistics that leave exact arithmetic.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

fn pow10(digits: u32) -> BigInt {
    num_traits::pow(BigInt::from(10), digits as usize)
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Exact {
                fn from(value: $t) -> Self {
                    Exact(BigRational::from_integer(BigInt::from(value)))
                }
            }
        )*
    };
}

from_integer!(i32, i64, u32, u64, usize);

impl From<Decimal> for Exact {
    fn from(value: Decimal) -> Self {
        Exact(BigRational::new(
            BigInt::from(value.mantissa()),
            pow10(value.scale()),
        ))
    }
}

impl FromStr for Exact {
    type Err = StratbenchError;

    /// Accepts `12`, `-0.997`, `1.5e-3` and `3397925/4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || StratbenchError::invalid_argument(format!("not a number: {s:?}"));

        if let Some((numer, denom)) = text.split_once('/') {
            let numer = BigInt::from_str(numer.trim()).map_err(|_| invalid())?;
            let denom = BigInt::from_str(denom.trim()).map_err(|_| invalid())?;
            if denom.is_zero() {
                return Err(StratbenchError::DivisionByZero);
            }
            return Ok(Exact(BigRational::new(numer, denom)));
        }

        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(pos) => {
                let exp = text[pos + 1..].parse::<i32>().map_err(|_| invalid())?;
                if exp.unsigned_abs() > MAX_EXPONENT {
                    return Err(invalid());
                }
                (&text[..pos], exp)
            }
            None => (text, 0),
        };

        let (negative, unsigned) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = format!("{int_part}{frac_part}");
        let mut numer = BigInt::from_str(&digits).map_err(|_| invalid())?;
        if negative {
            numer = -numer;
        }

        let shift = exponent - frac_part.len() as i32;
        let value = if shift >= 0 {
            BigRational::from_integer(numer * pow10(shift as u32))
        } else {
            BigRational::new(numer, pow10(shift.unsigned_abs()))
        };
        Ok(Exact(value))
    }
}

impl fmt::Display for Exact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_integer() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Exact> for Exact {
            type Output = Exact;
            fn $method(self, rhs: Exact) -> Exact {
                Exact(self.0.$method(rhs.0))
            }
        }

        impl<'a> $imp<&'a Exact> for Exact {
            type Output = Exact;
            fn $method(self, rhs: &'a Exact) -> Exact {
                Exact(self.0.$method(&rhs.0))
            }
        }

        impl<'a> $imp<Exact> for &'a Exact {
            type Output = Exact;
            fn $method(self, rhs: Exact) -> Exact {
                Exact((&self.0).$method(rhs.0))
            }
        }

        impl<'a, 'b> $imp<&'b Exact> for &'a Exact {
            type Output = Exact;
            fn $method(self, rhs: &'b Exact) -> Exact {
                Exact((&self.0).$method(&rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

impl AddAssign<&Exact> for Exact {
    fn add_assign(&mut self, rhs: &Exact) {
        self.0 = &self.0 + &rhs.0;
    }
}

impl SubAssign<&Exact> for Exact {
    fn sub_assign(&mut self, rhs: &Exact) {
        self.0 = &self.0 - &rhs.0;
    }
}

impl Neg for Exact {
    type Output = Exact;
    fn neg(self) -> Exact {
        Exact(-self.0)
    }
}

impl<'a> Sum<&'a Exact> for Exact {
    fn sum<I: Iterator<Item = &'a Exact>>(iter: I) -> Self {
        iter.fold(Exact::zero(), |acc, x| acc + x)
    }
}

impl Sum for Exact {
    fn sum<I: Iterator<Item = Exact>>(iter: I) -> Self {
        iter.fold(Exact::zero(), |acc, x| acc + x)
    }
}
