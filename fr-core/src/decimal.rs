//! Fixed-scale decimal numbers over big integers.

use std::ops::{Add, Mul, Neg, Sub};

use num::{BigInt, BigRational, FromPrimitive, Integer, Signed, ToPrimitive, Zero};

use crate::{number::FractalNumber, Error};

/// A decimal with `D` fractional digits and an unbounded integer part.
///
/// Stored as the value times 10^D. Products, quotients and conversions round half
/// away from zero to the nearest representable value; sums and differences are exact.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal<const D: u32> {
    scaled: BigInt,
}

impl<const D: u32> Decimal<D> {
    fn scale() -> BigInt {
        num::pow(BigInt::from(10), D as usize)
    }

    /// The value times 10^D.
    pub fn scaled(&self) -> &BigInt {
        &self.scaled
    }
}

/// `n / d`, rounded half away from zero.
fn div_round(n: &BigInt, d: &BigInt) -> BigInt {
    let (q, r) = n.div_rem(d);
    if r.abs() * 2 >= d.abs() {
        if n.is_negative() != d.is_negative() {
            q - 1
        } else {
            q + 1
        }
    } else {
        q
    }
}

impl<const D: u32> Add for Decimal<D> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Decimal {
            scaled: self.scaled + rhs.scaled,
        }
    }
}

impl<const D: u32> Sub for Decimal<D> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Decimal {
            scaled: self.scaled - rhs.scaled,
        }
    }
}

impl<const D: u32> Mul for Decimal<D> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Decimal {
            scaled: div_round(&(self.scaled * rhs.scaled), &Self::scale()),
        }
    }
}

impl<const D: u32> Neg for Decimal<D> {
    type Output = Self;

    fn neg(self) -> Self {
        Decimal {
            scaled: -self.scaled,
        }
    }
}

impl<const D: u32> FractalNumber for Decimal<D> {
    fn from_i32(i: i32) -> Self {
        Decimal {
            scaled: BigInt::from(i) * Self::scale(),
        }
    }

    fn from_f64(value: f64) -> Result<Self, Error> {
        let exact = BigRational::from_f64(value)
            .ok_or_else(|| Error::Numeric(format!("{} has no decimal value", value)))?;
        Self::from_bigrational(&exact)
    }

    fn to_f64(&self) -> f64 {
        BigRational::new(self.scaled.clone(), Self::scale())
            .to_f64()
            .unwrap_or(f64::NAN)
    }

    fn from_bigrational(value: &BigRational) -> Result<Self, Error> {
        Ok(Decimal {
            scaled: div_round(&(value.numer() * Self::scale()), value.denom()),
        })
    }

    fn to_bigrational(&self) -> Option<BigRational> {
        Some(BigRational::new(self.scaled.clone(), Self::scale()))
    }

    fn checked_div(&self, rhs: &Self) -> Result<Self, Error> {
        if rhs.scaled.is_zero() {
            return Err(Error::DivideByZero);
        }
        Ok(Decimal {
            scaled: div_round(&(&self.scaled * Self::scale()), &rhs.scaled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type D40 = Decimal<40>;
    type D1 = Decimal<1>;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    fn digits(n: char, count: usize) -> String {
        std::iter::repeat(n).take(count).collect()
    }

    #[test]
    fn test_thirds() {
        let third = D40::from_bigrational(&ratio(1, 3)).unwrap();
        assert_eq!(third.scaled().to_string(), digits('3', 40));
        let two_thirds = D40::from_bigrational(&ratio(2, 3)).unwrap();
        assert_eq!(
            two_thirds.scaled().to_string(),
            format!("{}7", digits('6', 39))
        );
        let neg = D40::from_bigrational(&ratio(-2, 3)).unwrap();
        assert_eq!(neg, -two_thirds);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(D1::from_bigrational(&ratio(1, 4)).unwrap().scaled(), &BigInt::from(3));
        assert_eq!(D1::from_bigrational(&ratio(-1, 4)).unwrap().scaled(), &BigInt::from(-3));
        assert_eq!(D1::from_bigrational(&ratio(1, 5)).unwrap().scaled(), &BigInt::from(2));
        // 0.5 * 0.5 = 0.25 -> 0.3
        let half = D1::from_f64(0.5).unwrap();
        assert_eq!((half.clone() * half).scaled(), &BigInt::from(3));
    }

    #[test]
    fn test_arithmetic() {
        let a = D40::from_f64(1.5).unwrap();
        let b = D40::from_i32(-2);
        assert_eq!((a.clone() + b.clone()).to_f64(), -0.5);
        assert_eq!((a.clone() - b.clone()).to_f64(), 3.5);
        assert_eq!((a.clone() * b.clone()).to_f64(), -3.0);
        assert_eq!(a.checked_div(&b).unwrap().to_f64(), -0.75);
        assert!(a > b);
        assert_eq!(b.abs(), D40::from_i32(2));
        assert_eq!(b.to_bigrational(), Some(ratio(-2, 1)));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            D40::from_i32(1).checked_div(&D40::zero()),
            Err(Error::DivideByZero)
        );
        assert!(D40::from_f64(f64::INFINITY).is_err());
        assert!(D40::from_f64(f64::NAN).is_err());
    }
}
