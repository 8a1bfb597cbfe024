use std::cmp::Ordering;
use std::ops::{Add, Mul, Neg, Sub};

use num::{BigRational, Zero};

use super::{Power, Product};
use crate::Error;

/// A sum of products, none of which can combine with another.
///
/// The empty sum is zero; the sum holding only the empty product is one.
/// Summands are kept sorted, so two sums built from the same terms in a different
/// order compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sum {
    summands: Vec<Product>,
}

impl Sum {
    /// Builds a canonical sum.
    ///
    /// Each term is folded into the accumulated summands: zero terms are dropped,
    /// terms that are just a nested sum are spliced in, and a term that can combine
    /// with an existing summand replaces it with their sum. Repeats until no pair combines.
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let mut summands = Vec::new();
        for p in products {
            push_term(&mut summands, p);
        }
        summands.sort_by(|a, b| a.structural_cmp(b));
        Sum { summands }
    }

    pub fn zero() -> Self {
        Sum {
            summands: Vec::new(),
        }
    }

    pub fn one() -> Self {
        Sum {
            summands: vec![Product::one()],
        }
    }

    pub fn from_product(product: Product) -> Self {
        Self::new([product])
    }

    pub fn from_pair(a: Product, b: Product) -> Self {
        Self::new([a, b])
    }

    pub fn from_f64(value: f64) -> Result<Self, Error> {
        Ok(Self::from_product(Product::from_f64(value)?))
    }

    pub fn from_bigrational(value: &BigRational) -> Self {
        Self::from_product(Product::from_rational(value))
    }

    pub fn summands(&self) -> &[Product] {
        &self.summands
    }

    /// Structurally zero: no summands.
    pub fn is_zero(&self) -> bool {
        self.summands.is_empty()
    }

    /// Evaluates to zero, whatever the structure.
    pub fn is_zero_valued(&self) -> bool {
        matches!(self.to_bigrational(), Some(v) if v.is_zero())
    }

    /// Exact value, or `None` if some nested term divides by zero.
    pub fn to_bigrational(&self) -> Option<BigRational> {
        self.summands
            .iter()
            .try_fold(BigRational::zero(), |acc, p| Some(acc + p.to_bigrational()?))
    }

    pub fn to_f64(&self) -> f64 {
        super::rational_to_f64(self.to_bigrational())
    }

    pub fn negate(&self) -> Self {
        Self::new(self.summands.iter().map(Product::negate))
    }

    /// Distributes over both operands.
    pub fn multiply(&self, other: &Sum) -> Self {
        Self::new(
            self.summands
                .iter()
                .flat_map(|a| other.summands.iter().map(move |b| a.multiply(b))),
        )
    }

    /// Divides by `other`.
    ///
    /// A single-term divisor distributes its reciprocal over the summands;
    /// a wider divisor becomes a sum factor with exponent -1.
    pub fn checked_div(&self, other: &Sum) -> Result<Self, Error> {
        if other.is_zero() || other.is_zero_valued() {
            return Err(Error::DivideByZero);
        }
        let factor = match other.summands.as_slice() {
            [single] => single.reciprocal()?,
            _ => Product::new([], [Power::new(other.clone(), -1)]),
        };
        Ok(Self::new(self.summands.iter().map(|p| p.multiply(&factor))))
    }

    /// Total order on the representation.
    pub(crate) fn structural_cmp(&self, other: &Sum) -> Ordering {
        for (l, r) in self.summands.iter().zip(&other.summands) {
            let ord = l.structural_cmp(r);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.summands.len().cmp(&other.summands.len())
    }
}

/// The nested sum of a product that is nothing but `(sum)^1`.
fn as_bare_sum(term: &Product) -> Option<&Sum> {
    match term.sums() {
        [only] if term.constants().is_empty() && only.exponent == 1 => Some(&only.base),
        _ => None,
    }
}

fn push_term(summands: &mut Vec<Product>, term: Product) {
    if term.is_zero() {
        return;
    }
    if let Some(inner) = as_bare_sum(&term) {
        for p in inner.summands() {
            push_term(summands, p.clone());
        }
        return;
    }
    match summands.iter().position(|s| s.can_combine_with(&term)) {
        Some(i) => {
            let existing = summands.swap_remove(i);
            push_term(summands, existing.add(&term));
        }
        None => summands.push(term),
    }
}

impl Add for Sum {
    type Output = Sum;

    fn add(self, rhs: Sum) -> Sum {
        Sum::new(self.summands.into_iter().chain(rhs.summands))
    }
}

impl Sub for Sum {
    type Output = Sum;

    fn sub(self, rhs: Sum) -> Sum {
        self + rhs.negate()
    }
}

impl Mul for Sum {
    type Output = Sum;

    fn mul(self, rhs: Sum) -> Sum {
        self.multiply(&rhs)
    }
}

impl Neg for Sum {
    type Output = Sum;

    fn neg(self) -> Sum {
        self.negate()
    }
}

/// Orders by exact value.
///
/// Equality is structural, so two sums with the same value but a different
/// grouping of terms are neither equal nor ordered: this returns `None` for them.
impl PartialOrd for Sum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match self.to_bigrational()?.cmp(&other.to_bigrational()?) {
            Ordering::Equal => None,
            ord => Some(ord),
        }
    }
}
