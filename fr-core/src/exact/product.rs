use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use num::{BigInt, BigRational, Float, One, Signed, Zero};

use super::{factor::factorize, Power, Sum};
use crate::Error;

/// A product of integer powers and powers of nested sums.
///
/// Products are canonical on construction:
/// - a zero base anywhere collapses the product to the canonical zero, `0^1` with no sums;
/// - equal bases are merged, base 1 and exponent 0 are dropped;
/// - the sign is carried as a single `(-1)^1` factor, or not at all;
/// - sums holding a single product are flattened into this product;
/// - factors are sorted, so structural equality does not depend on construction order.
///
/// A product with no factors is one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Product {
    constants: Vec<Power<BigInt>>,
    sums: Vec<Power<Sum>>,
}

impl Product {
    pub fn new(
        constants: impl IntoIterator<Item = Power<BigInt>>,
        sums: impl IntoIterator<Item = Power<Sum>>,
    ) -> Self {
        let mut merged: BTreeMap<BigInt, i32> = BTreeMap::new();
        let mut sign = 0i32;
        let mut sum_factors: Vec<Power<Sum>> = Vec::new();

        let mut push_constant = |base: BigInt, exponent: i32, sign: &mut i32| -> bool {
            if exponent == 0 || base.is_one() {
                return true;
            }
            if base.is_zero() {
                return false;
            }
            if base.is_negative() {
                *sign += exponent;
                let base = -base;
                if !base.is_one() {
                    *merged.entry(base).or_insert(0) += exponent;
                }
            } else {
                *merged.entry(base).or_insert(0) += exponent;
            }
            true
        };

        for c in constants {
            if !push_constant(c.base, c.exponent, &mut sign) {
                return Self::zero();
            }
        }

        for s in sums {
            if s.exponent == 0 {
                continue;
            }
            let summands = s.base.summands();
            if summands.is_empty() {
                return Self::zero();
            }
            if summands.len() == 1 {
                let inner = &summands[0];
                for c in &inner.constants {
                    if !push_constant(c.base.clone(), c.exponent * s.exponent, &mut sign) {
                        return Self::zero();
                    }
                }
                for nested in &inner.sums {
                    merge_sum(&mut sum_factors, nested.base.clone(), nested.exponent * s.exponent);
                }
            } else {
                merge_sum(&mut sum_factors, s.base, s.exponent);
            }
        }

        let mut constants: Vec<Power<BigInt>> = Vec::with_capacity(merged.len() + 1);
        if sign.rem_euclid(2) == 1 {
            constants.push(Power::new(BigInt::from(-1), 1));
        }
        constants.extend(
            merged
                .into_iter()
                .filter(|(_, exponent)| *exponent != 0)
                .map(|(base, exponent)| Power::new(base, exponent)),
        );
        sum_factors.sort_by(|a, b| {
            a.base
                .structural_cmp(&b.base)
                .then(a.exponent.cmp(&b.exponent))
        });

        Product {
            constants,
            sums: sum_factors,
        }
    }

    /// The canonical zero.
    pub fn zero() -> Self {
        Product {
            constants: vec![Power::new(BigInt::zero(), 1)],
            sums: Vec::new(),
        }
    }

    /// The canonical one: no factors at all.
    pub fn one() -> Self {
        Product {
            constants: Vec::new(),
            sums: Vec::new(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.constants.iter().any(|c| c.base.is_zero())
    }

    pub fn is_one(&self) -> bool {
        self.constants.is_empty() && self.sums.is_empty()
    }

    pub fn constants(&self) -> &[Power<BigInt>] {
        &self.constants
    }

    pub fn sums(&self) -> &[Power<Sum>] {
        &self.sums
    }

    /// Factors an integer.
    pub fn from_integer(value: &BigInt) -> Self {
        if value.is_zero() {
            return Self::zero();
        }
        let mut constants = factorize(value);
        if value.is_negative() {
            constants.push(Power::new(BigInt::from(-1), 1));
        }
        Self::new(constants, [])
    }

    /// Factors a rational: numerator powers positive, denominator powers negative.
    pub fn from_rational(value: &BigRational) -> Self {
        if value.is_zero() {
            return Self::zero();
        }
        let numer = Self::from_integer(value.numer());
        let denom = factorize(value.denom())
            .into_iter()
            .map(|p| Power::new(p.base, -p.exponent));
        Self::new(numer.constants.into_iter().chain(denom), [])
    }

    /// Exact entry point from floating point.
    ///
    /// The value is split into an odd integer mantissa and a power of two,
    /// so the decomposition is exact for every finite input.
    pub fn from_f64(value: f64) -> Result<Self, Error> {
        if !value.is_finite() {
            return Err(Error::Numeric(format!("{} has no exact value", value)));
        }
        if value == 0.0 {
            return Ok(Self::zero());
        }
        let (mut mantissa, mut exponent, sign) = value.integer_decode();
        let shift = mantissa.trailing_zeros();
        mantissa >>= shift;
        exponent += shift as i16;

        let mut constants = factorize(&BigInt::from(mantissa));
        if sign < 0 {
            constants.push(Power::new(BigInt::from(-1), 1));
        }
        constants.push(Power::new(BigInt::from(2u32), exponent as i32));
        Ok(Self::new(constants, []))
    }

    pub fn negate(&self) -> Self {
        self.multiply(&Self::new([Power::new(BigInt::from(-1), 1)], []))
    }

    pub fn reciprocal(&self) -> Result<Self, Error> {
        if self.is_zero() {
            return Err(Error::DivideByZero);
        }
        if self.sums.iter().any(|s| s.base.is_zero_valued()) {
            return Err(Error::DivideByZero);
        }
        Ok(Self::new(
            self.constants
                .iter()
                .map(|c| Power::new(c.base.clone(), -c.exponent)),
            self.sums
                .iter()
                .map(|s| Power::new(s.base.clone(), -s.exponent)),
        ))
    }

    pub fn multiply(&self, other: &Product) -> Self {
        Self::new(
            self.constants.iter().chain(&other.constants).cloned(),
            self.sums.iter().chain(&other.sums).cloned(),
        )
    }

    pub fn divide(&self, other: &Product) -> Result<Self, Error> {
        Ok(self.multiply(&other.reciprocal()?))
    }

    /// Greatest common divisor of the integer factors.
    ///
    /// For every base in either product the exponent is the smaller of the two,
    /// counting a missing base as exponent zero. Exponents may be negative, so this
    /// is the rational GCD: both `self / gcd` and `other / gcd` have integer constant parts.
    /// The sign and sum factors never contribute.
    pub fn greatest_common_divisor(&self, other: &Product) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::one();
        }
        let exponent_of = |p: &Product, base: &BigInt| -> i32 {
            p.constants
                .iter()
                .find(|c| &c.base == base)
                .map_or(0, |c| c.exponent)
        };
        let bases: BTreeSet<&BigInt> = self
            .constants
            .iter()
            .chain(&other.constants)
            .map(|c| &c.base)
            .filter(|b| b.is_positive())
            .collect();
        Self::new(
            bases.into_iter().map(|b| {
                Power::new(
                    b.clone(),
                    std::cmp::min(exponent_of(self, b), exponent_of(other, b)),
                )
            }),
            [],
        )
    }

    pub fn can_combine_with(&self, other: &Product) -> bool {
        self == other || !self.greatest_common_divisor(other).is_one()
    }

    /// Adds two products.
    ///
    /// Both are divided by their GCD. Remainders with the same sum factors
    /// (in particular, two constant-only remainders) are added on their integer coefficients;
    /// otherwise they become a new two-term sum. The result is multiplied back by the GCD.
    pub fn add(&self, other: &Product) -> Self {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let gcd = self.greatest_common_divisor(other);
        let inverse = match gcd.reciprocal() {
            Ok(v) => v,
            // The GCD is built from nonzero integer bases only.
            Err(_) => Self::one(),
        };
        let me = self.multiply(&inverse);
        let oth = other.multiply(&inverse);

        let combined = if me.sums == oth.sums {
            let coefficient = me.coefficient() + oth.coefficient();
            Self::from_rational(&coefficient).multiply(&Self::new([], me.sums))
        } else {
            Self::new([], [Power::new(Sum::from_pair(me, oth), 1)])
        };
        combined.multiply(&gcd)
    }

    pub fn subtract(&self, other: &Product) -> Self {
        self.add(&other.negate())
    }

    /// Value of the integer factors alone.
    fn coefficient(&self) -> BigRational {
        self.constants
            .iter()
            .fold(BigRational::one(), |acc, c| {
                acc * BigRational::from_integer(c.base.clone()).pow(c.exponent)
            })
    }

    /// Exact value. `None` only when a nested sum with a negative exponent evaluates to zero.
    pub fn to_bigrational(&self) -> Option<BigRational> {
        if self.is_zero() {
            return Some(BigRational::zero());
        }
        let mut value = self.coefficient();
        for s in &self.sums {
            let base = s.base.to_bigrational()?;
            if base.is_zero() && s.exponent < 0 {
                return None;
            }
            value *= base.pow(s.exponent);
        }
        Some(value)
    }

    pub fn to_f64(&self) -> f64 {
        super::rational_to_f64(self.to_bigrational())
    }

    /// Total order on the representation, used to keep factors and summands sorted.
    pub(crate) fn structural_cmp(&self, other: &Product) -> Ordering {
        self.constants.cmp(&other.constants).then_with(|| {
            for (l, r) in self.sums.iter().zip(&other.sums) {
                let ord = l
                    .base
                    .structural_cmp(&r.base)
                    .then(l.exponent.cmp(&r.exponent));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            self.sums.len().cmp(&other.sums.len())
        })
    }
}

fn merge_sum(factors: &mut Vec<Power<Sum>>, base: Sum, exponent: i32) {
    match factors.iter().position(|f| f.base == base) {
        Some(i) => {
            factors[i].exponent += exponent;
            if factors[i].exponent == 0 {
                factors.remove(i);
            }
        }
        None => factors.push(Power::new(base, exponent)),
    }
}
