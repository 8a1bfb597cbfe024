use std::{
    fmt::Debug,
    ops::{Add, Mul, Neg, Sub},
};

use num::{BigRational, FromPrimitive, ToPrimitive};

use crate::{exact::Sum, Error};

/// A numeric type that fractal iteration can run over.
///
/// This trait identifies the operations the mapper and the escape-time loop need:
/// - Addition, subtraction, multiplication, negation - for complex arithmetic
/// - Division (fallible) - for the pixel-to-plane scale
/// - Comparison - for bounds-checking
/// - Exact interchange with BigRational - for converting between backends
///
/// Conversions into a narrower backend are lossy; each impl documents what happens
/// outside its range.
pub trait FractalNumber:
    Sized
    + Clone
    + Debug
    + Send
    + Sync
    + Add<Self, Output = Self>
    + Sub<Self, Output = Self>
    + Mul<Self, Output = Self>
    + Neg<Output = Self>
    + PartialEq<Self>
    + PartialOrd<Self>
{
    // Provides a way to turn an int into this type.
    fn from_i32(i: i32) -> Self;

    fn from_f64(value: f64) -> Result<Self, Error>;

    // Provides a way to get a f64 from this type.
    fn to_f64(&self) -> f64;

    /// Converts from BigRational.
    ///
    /// This is provided as a distinct method because we can't expect `From<BigRational>`
    /// on foreign types.
    fn from_bigrational(value: &BigRational) -> Result<Self, Error>;

    /// The exact value, if it has one.
    fn to_bigrational(&self) -> Option<BigRational>;

    fn checked_div(&self, rhs: &Self) -> Result<Self, Error>;

    fn zero() -> Self {
        Self::from_i32(0)
    }

    fn abs(&self) -> Self {
        if *self < Self::zero() {
            -self.clone()
        } else {
            self.clone()
        }
    }
}

/// Converts between backends through their exact value.
pub fn convert<A: FractalNumber, B: FractalNumber>(value: &A) -> Result<B, Error> {
    let exact = value
        .to_bigrational()
        .ok_or_else(|| Error::Numeric(format!("{:?} has no exact value", value)))?;
    B::from_bigrational(&exact)
}

/// IEEE single precision.
///
/// Division by zero gives an infinity or NaN. `from_bigrational` and `from_f64` fail
/// if a finite value overflows (`from_f64` passes infinities and NaN through, and
/// rounds values below the f32 range to zero); `to_bigrational` is `None` for
/// infinities and NaN.
impl FractalNumber for f32 {
    fn from_i32(i: i32) -> Self {
        i as f32
    }

    fn from_f64(value: f64) -> Result<Self, Error> {
        let narrowed = value as f32;
        if value.is_finite() && !narrowed.is_finite() {
            return Err(Error::Numeric(format!("{} is out of range for f32", value)));
        }
        Ok(narrowed)
    }

    fn to_f64(&self) -> f64 {
        (*self).into()
    }

    fn from_bigrational(value: &BigRational) -> Result<Self, Error> {
        match value.to_f32() {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(Error::Numeric(format!("{} is out of range for f32", value))),
        }
    }

    fn to_bigrational(&self) -> Option<BigRational> {
        BigRational::from_f32(*self)
    }

    fn checked_div(&self, rhs: &Self) -> Result<Self, Error> {
        Ok(self / rhs)
    }

    fn abs(&self) -> Self {
        f32::abs(*self)
    }
}

/// IEEE double precision. Same range behavior as `f32`.
impl FractalNumber for f64 {
    fn from_i32(i: i32) -> Self {
        i.into()
    }

    fn from_f64(value: f64) -> Result<Self, Error> {
        Ok(value)
    }

    fn to_f64(&self) -> f64 {
        *self
    }

    fn from_bigrational(value: &BigRational) -> Result<Self, Error> {
        match value.to_f64() {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(Error::Numeric(format!("{} is out of range for f64", value))),
        }
    }

    fn to_bigrational(&self) -> Option<BigRational> {
        BigRational::from_f64(*self)
    }

    fn checked_div(&self, rhs: &Self) -> Result<Self, Error> {
        Ok(self / rhs)
    }

    fn abs(&self) -> Self {
        f64::abs(*self)
    }
}

/// Exact symbolic values. Nothing rounds except `to_f64`, which picks the nearest double.
/// Non-finite doubles and division by an exact zero are errors.
impl FractalNumber for Sum {
    fn from_i32(i: i32) -> Self {
        Sum::from_bigrational(&BigRational::from_integer(i.into()))
    }

    fn from_f64(value: f64) -> Result<Self, Error> {
        Sum::from_f64(value)
    }

    fn to_f64(&self) -> f64 {
        Sum::to_f64(self)
    }

    fn from_bigrational(value: &BigRational) -> Result<Self, Error> {
        Ok(Sum::from_bigrational(value))
    }

    fn to_bigrational(&self) -> Option<BigRational> {
        Sum::to_bigrational(self)
    }

    fn checked_div(&self, rhs: &Self) -> Result<Self, Error> {
        Sum::checked_div(self, rhs)
    }

    fn zero() -> Self {
        Sum::zero()
    }
}
