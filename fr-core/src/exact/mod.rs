//! Exact symbolic arithmetic.
//!
//! Values are kept as a [`Sum`] of [`Product`]s. A product is a run of integer
//! prime powers times powers of nested sums, so any value reachable from
//! doubles and rationals by `+ - * /` is represented without rounding.
//!
//! Equality is structural on the canonical form. Canonicalization combines
//! terms that share a prime factor but leaves coprime terms apart, so two equal
//! values can still differ in structure (`8 + 3` against `11`).

mod factor;
mod product;
mod sum;

use num::{BigRational, ToPrimitive};

pub use product::Product;
pub use sum::Sum;

/// `base ^ exponent`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Power<B> {
    pub base: B,
    pub exponent: i32,
}

impl<B> Power<B> {
    pub fn new(base: B, exponent: i32) -> Self {
        Power { base, exponent }
    }
}

/// Nearest double, or NaN for an undefined value.
fn rational_to_f64(value: Option<BigRational>) -> f64 {
    value.and_then(|v| v.to_f64()).unwrap_or(f64::NAN)
}
