// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

use std::borrow::Borrow;
use std::num::NonZeroUsize;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::csprng::Csprng;

/// The number of Miller-Rabin iterations performed by [`is_prime`].
pub const MILLER_RABIN_ITERATIONS: usize = 50;

/// Largest number resolved by exhaustive trial division rather than
/// probabilistically.
const TRIAL_DIVISION_MAX: u32 = 1 << 20;

/// Primality test.
///
/// Below [`TRIAL_DIVISION_MAX`] the answer is exact (trial division); above,
/// it is probabilistic with [`MILLER_RABIN_ITERATIONS`] rounds of
/// Miller-Rabin. Expensive for large inputs.
pub fn is_prime<T: Borrow<BigUint>>(n: &T, csprng: &mut Csprng) -> bool {
    let n: &BigUint = n.borrow();

    if n.bits() <= 1 {
        // 0 and 1 are not prime.
        return false;
    }
    if n.bits() == 2 {
        // 2 and 3 are prime.
        return true;
    }
    if n.is_even() {
        return false;
    }

    if n.bits() <= 20 {
        static_assertions::const_assert!(TRIAL_DIVISION_MAX < u32::MAX);
        let n_u32 = n.iter_u32_digits().next().unwrap_or_default();
        let n_sqrt = n_u32.isqrt();
        for d in (3..=n_sqrt).step_by(2) {
            if n_u32 % d == 0 {
                return false;
            }
        }
        return true;
    }

    miller_rabin(n, MILLER_RABIN_ITERATIONS, csprng)
}

/// Miller-Rabin probabilistic primality test per NIST FIPS 186-5 B.3.1.
fn miller_rabin(w: &BigUint, iterations: usize, csprng: &mut Csprng) -> bool {
    assert!(w.is_odd(), "requires w odd");
    assert!(!w.is_one(), "requires 3 <= w");
    assert!(iterations > 0);

    // Let a be the largest integer such that 2^a divides w-1, m = (w-1)/2^a.
    let w_minus_1: BigUint = w - 1_u8;
    // `unwrap()` is justified here because `w` is odd, so `w - 1` is even and nonzero.
    #[allow(clippy::unwrap_used)]
    let a = w_minus_1.trailing_zeros().unwrap();
    let m = &w_minus_1 >> a;

    // `unwrap()` is justified here because 3 <= `w`.
    #[allow(clippy::unwrap_used)]
    let wlen = NonZeroUsize::new(w.bits() as usize).unwrap();

    let two = BigUint::from(2_u8);

    'witness: for _ in 0..iterations {
        let b = loop {
            let b = csprng.next_biguint(wlen);
            if !(b.is_zero() || b.is_one() || b >= w_minus_1) {
                break b;
            }
        };

        let mut z = b.modpow(&m, w);
        if z.is_one() || z == w_minus_1 {
            continue 'witness;
        }

        for _ in 1..a {
            z = z.modpow(&two, w);
            if z == w_minus_1 {
                continue 'witness;
            }
            if z.is_one() {
                break;
            }
        }

        return false;
    }

    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_primes {
    use super::*;
    use num_traits::Num;

    #[test]
    fn small_integers() {
        let mut csprng = Csprng::new(b"test small integers");
        let expected = [
            false, false, true, true, false, true, false, true, false, false,
        ];
        for (n, expected_prime) in expected.into_iter().enumerate() {
            assert_eq!(
                is_prime(&BigUint::from(n), &mut csprng),
                expected_prime,
                "n = {n}"
            );
        }
    }

    #[test]
    fn known_primes_and_neighbors() {
        let mut csprng = Csprng::new(b"test known primes");

        // Primes whose immediate even/odd neighbors at distance 2 are composite.
        for p_str in [
            "23",
            "251",
            "7901",
            "524287",
            "2147483647",
            "2305843009213693951",
            "162259276829213363391578010288127",
            "170141183460469231731687303715884105727",
        ] {
            let p = BigUint::from_str_radix(p_str, 10).unwrap();

            let mut n = &p - BigUint::from(2_u8);
            for expected_prime in (-2i8..=2).map(|offset| offset == 0) {
                assert_eq!(is_prime(&n, &mut csprng), expected_prime, "n = {n}");
                n += BigUint::one();
            }
        }
    }
}
