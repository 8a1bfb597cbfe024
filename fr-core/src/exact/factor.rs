//! Trial-division factorization for the exact engine.

use num::{BigInt, Integer, One, Signed, ToPrimitive, Zero};

use super::Power;

/// Largest trial divisor for values up to `MANTISSA_BITS` wide.
/// Every f64 mantissa is below 2^53, so its square root is below this.
const TRIAL_LIMIT: u64 = 1 << 27;

/// Values at most this wide are factored completely.
const MANTISSA_BITS: u64 = 54;

/// Largest trial divisor for wider values.
const BIG_TRIAL_LIMIT: u64 = 1 << 16;

/// Prime-power factors of `|n|`, in ascending order of base.
///
/// Zero has no factorization; callers handle it before getting here.
/// A cofactor left over once the trial divisors are exhausted is kept as a single base,
/// which is only guaranteed prime below the trial limits.
pub(crate) fn factorize(n: &BigInt) -> Vec<Power<BigInt>> {
    debug_assert!(!n.is_zero());
    let mut n = n.abs();
    let mut powers = Vec::new();

    let twos = n.trailing_zeros().unwrap_or(0);
    if twos > 0 {
        n >>= twos;
        powers.push(Power::new(BigInt::from(2u32), twos as i32));
    }

    match n.to_u64() {
        Some(small) if n.bits() <= MANTISSA_BITS => factor_u64(small, TRIAL_LIMIT, &mut powers),
        _ => factor_big(n, &mut powers),
    }
    powers
}

/// Prime-power factors of an odd `n`, trying divisors up to `limit`.
fn factor_u64(mut n: u64, limit: u64, powers: &mut Vec<Power<BigInt>>) {
    let mut i = 3u64;
    while i <= limit && i.saturating_mul(i) <= n {
        let mut count = 0;
        while n % i == 0 {
            n /= i;
            count += 1;
        }
        if count > 0 {
            powers.push(Power::new(BigInt::from(i), count));
        }
        i += 2;
    }
    if n > 2 {
        powers.push(Power::new(BigInt::from(n), 1));
    }
}

fn factor_big(mut n: BigInt, powers: &mut Vec<Power<BigInt>>) {
    let mut i = 3u64;
    while i <= BIG_TRIAL_LIMIT {
        let divisor = BigInt::from(i);
        if &divisor * &divisor > n {
            break;
        }
        let mut count = 0;
        loop {
            let (q, r) = n.div_rem(&divisor);
            if !r.is_zero() {
                break;
            }
            n = q;
            count += 1;
        }
        if count > 0 {
            powers.push(Power::new(divisor, count));
        }
        i += 2;
    }
    // Small cofactors may still fit the fast path.
    if n.bits() <= MANTISSA_BITS {
        if let Some(small) = n.to_u64() {
            if small > 2 {
                factor_u64(small, TRIAL_LIMIT, powers);
            }
            return;
        }
    }
    if !n.is_one() {
        powers.push(Power::new(n, 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors(n: i64) -> Vec<(i64, i32)> {
        factorize(&BigInt::from(n))
            .into_iter()
            .map(|p| (p.base.to_i64().unwrap(), p.exponent))
            .collect()
    }

    #[test]
    fn test_small_factors() {
        assert_eq!(factors(1), vec![]);
        assert_eq!(factors(2), vec![(2, 1)]);
        assert_eq!(factors(12), vec![(2, 2), (3, 1)]);
        assert_eq!(factors(-45), vec![(3, 2), (5, 1)]);
        assert_eq!(factors(97), vec![(97, 1)]);
        assert_eq!(factors(1024), vec![(2, 10)]);
    }

    #[test]
    fn test_mantissa_sized_prime() {
        // 2^53 - 111 is prime; trial division must run up to its square root.
        let p = (1i64 << 53) - 111;
        assert_eq!(factors(p), vec![(p, 1)]);
    }

    #[test]
    fn test_wide_value() {
        // 3^50 * 7 does not fit in a u64.
        let n = num::pow(BigInt::from(3), 50) * 7;
        let f = factorize(&n);
        assert_eq!(f, vec![Power::new(BigInt::from(3), 50), Power::new(BigInt::from(7), 1)]);
    }
}
