// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Deterministic cryptographically-strong pseudorandom stream based on the
//! SHAKE-256 extendable-output function.
//!
//! Every value drawn from a [`Csprng`] is a pure function of the seed data, so
//! two instances built from the same seed parts yield identical streams. Seed
//! parts are length-prefixed before absorption, so distinct part boundaries
//! can never collide.

use num_bigint::BigUint;
use num_traits::Zero;
use std::num::NonZeroUsize;

pub struct Csprng(Box<dyn sha3::digest::XofReader + Send>);

impl Csprng {
    /// Creates a `Csprng` from a single seed byte string.
    pub fn new(seed: &[u8]) -> Csprng {
        Csprng::with_tags([seed])
    }

    /// Creates a `Csprng` from a sequence of seed parts.
    ///
    /// Each part is absorbed with a length prefix, so `["ab", "c"]` and
    /// `["a", "bc"]` produce unrelated streams.
    pub fn with_tags<'a, I>(parts: I) -> Csprng
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        use sha3::digest::{ExtendableOutput, Update};

        let mut hasher = sha3::Shake256::default();

        let domain = b"verifiable tally csprng";
        hasher.update(&(domain.len() as u64).to_le_bytes());
        hasher.update(&domain[..]);

        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }

        Csprng(Box::new(hasher.finalize_xof()))
    }

    /// Creates a `Csprng` seeded from operating system entropy.
    pub fn from_os_entropy() -> Result<Csprng, getrandom::Error> {
        let mut seed = [0u8; 32];
        getrandom::fill(&mut seed)?;
        Ok(Csprng::new(&seed))
    }

    /// Returns a uniformly random `u8`.
    pub fn next_u8(&mut self) -> u8 {
        let mut buf = [0u8];
        self.0.read(&mut buf);
        buf[0]
    }

    /// Returns a uniformly random `u64`.
    pub fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.0.read(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Fills `dest` with random bytes.
    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.read(dest);
    }

    /// Returns a random number chosen uniformly from `0 <= n < 2^bits`.
    pub fn next_biguint(&mut self, bits: NonZeroUsize) -> BigUint {
        let bits = bits.get();

        let cnt_bytes = bits.div_ceil(8);
        let mut buf = vec![0u8; cnt_bytes];
        self.0.read(buf.as_mut_slice());

        // Mask off any bits in excess of the requested length.
        let cnt_extra_bits = cnt_bytes * 8 - bits;
        if 0 < cnt_extra_bits {
            debug_assert!(cnt_extra_bits < 8);
            buf[0] &= 0xFF_u8 >> cnt_extra_bits;
        }

        BigUint::from_bytes_be(buf.as_slice())
    }

    /// Returns a random number chosen uniformly from `0 <= n < end`.
    /// `end` must be greater than `0`.
    pub fn next_biguint_lt(&mut self, end: &BigUint) -> BigUint {
        assert!(!end.is_zero(), "end must be greater than 0");

        // The `.unwrap()` is justified here because `end` is nonzero.
        #[allow(clippy::unwrap_used)]
        let bits = NonZeroUsize::new(end.bits() as usize).unwrap();

        // Rejection sampling keeps the distribution uniform.
        loop {
            let n = self.next_biguint(bits);
            if &n < end {
                break n;
            }
        }
    }

    /// Returns a random number chosen uniformly from `start <= n < end`.
    /// `start` must be less than `end`.
    pub fn next_biguint_range(&mut self, start: &BigUint, end: &BigUint) -> BigUint {
        assert!(start < end, "start must be less than end");
        start + self.next_biguint_lt(&(end - start))
    }
}

impl std::fmt::Debug for Csprng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Csprng")
    }
}

#[cfg(test)]
mod test_csprng {
    use super::*;
    use num_traits::One;

    #[test]
    fn deterministic_for_equal_seeds() {
        let mut a = Csprng::new(b"csprng test seed");
        let mut b = Csprng::new(b"csprng test seed");
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn part_boundaries_matter() {
        let mut a = Csprng::with_tags([b"ab".as_slice(), b"c".as_slice()]);
        let mut b = Csprng::with_tags([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn next_biguint_bounds() {
        let mut csprng = Csprng::new(b"biguint bounds");
        for bits in 1..100usize {
            #[allow(clippy::unwrap_used)]
            let j = csprng.next_biguint(NonZeroUsize::new(bits).unwrap());
            assert!(j < (BigUint::one() << bits));
        }
    }

    #[test]
    fn next_biguint_lt_bounds() {
        let mut csprng = Csprng::new(b"biguint lt");
        for end in 1usize..100 {
            let end: BigUint = end.into();
            let j = csprng.next_biguint_lt(&end);
            assert!(j < end);
        }
    }

    #[test]
    fn next_biguint_range_bounds() {
        let mut csprng = Csprng::new(b"biguint range");
        for start in 0usize..20 {
            for end in start + 1..25 {
                let start: BigUint = start.into();
                let end: BigUint = end.into();
                let j = csprng.next_biguint_range(&start, &end);
                assert!(start <= j && j < end);
            }
        }
    }
}
