use std::ops::{Add, Mul, Sub};

use crate::number::FractalNumber;

/// Complex number implementation.
/// A little more granular than num_traits, because we're only interested in certain ops.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Complex<N> {
    pub re: N,
    pub im: N,
}

impl<N> Complex<N> {
    pub fn new(re: N, im: N) -> Self {
        Complex { re, im }
    }
}

impl<N: FractalNumber> Complex<N> {
    pub fn zero() -> Self {
        Complex::new(N::zero(), N::zero())
    }

    /// Squares the given number.
    /// This takes fewer multiplications than a generic multiply.
    pub fn square(&self) -> Self {
        // (a+bi)^2 = (a^2-b^2) + 2abi
        let (a, b) = (self.re.clone(), self.im.clone());
        let re = a.clone() * a.clone() - b.clone() * b.clone();
        let ab = a * b;
        let im = ab.clone() + ab;
        Self { re, im }
    }

    /// |z|^2, skipping the square root.
    pub fn norm_sqr(&self) -> N {
        self.re.clone() * self.re.clone() + self.im.clone() * self.im.clone()
    }
}

impl<N> Mul<Complex<N>> for Complex<N>
where
    N: Clone + Add<N, Output = N> + Sub<N, Output = N> + Mul<N, Output = N>,
{
    type Output = Complex<N>;

    fn mul(self, rhs: Complex<N>) -> Self {
        // (a + ib) * (c + id)
        // = (ac - bd) + i(ad + bc)
        let (a, b) = (self.re, self.im);
        let (c, d) = (rhs.re, rhs.im);
        let re: N = (a.clone() * c.clone()) - (b.clone() * d.clone());
        let im: N = a * d + b * c;
        Self { re, im }
    }
}

impl<N> Add<Complex<N>> for Complex<N>
where
    N: Add<N, Output = N>,
{
    type Output = Complex<N>;

    fn add(self, rhs: Complex<N>) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_matches_mul() {
        let z = Complex::new(1.5f64, -0.25);
        assert_eq!(z.square(), z * z);
        assert_eq!(z.square(), Complex::new(2.1875, -0.75));
    }

    #[test]
    fn test_norm() {
        assert_eq!(Complex::new(3.0f64, -4.0).norm_sqr(), 25.0);
        assert_eq!(Complex::<f64>::zero().norm_sqr(), 0.0);
    }
}
