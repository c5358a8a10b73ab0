// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Utility functions over `BigUint` shared by the field and group wrappers.

use std::{borrow::Borrow, collections::HashMap, mem};

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};

use crate::algebra::{Group, GroupElement};

/// Returns the number of bits required to encode the given number.
pub fn cnt_bits_repr<T: Borrow<BigUint>>(n: &T) -> usize {
    let n: &BigUint = n.borrow();
    if n.is_zero() { 1 } else { n.bits() as usize }
}

/// Encodes a `BigUint` big-endian, left-padded with zeros to length `len`.
pub fn to_be_bytes_left_pad<T: Borrow<BigUint>>(n: &T, len: usize) -> Vec<u8> {
    let n: &BigUint = n.borrow();

    let mut v = n.to_bytes_be();
    if v.len() < len {
        let left_pad = len - v.len();
        v.reserve(left_pad);
        v.extend(std::iter::repeat_n(0, left_pad));
        v.rotate_right(left_pad);
    }

    assert!(len <= v.len());

    v
}

/// Computes the inverse of `a_u` modulo `m_u`, if it exists.
///
/// Extended Euclidean algorithm; returns `Some` iff `gcd(a_u, m_u) == 1`.
pub fn mod_inverse(a_u: &BigUint, m_u: &BigUint) -> Option<BigUint> {
    if m_u.is_zero() {
        return None;
    }
    let m = BigInt::from_biguint(Sign::Plus, m_u.clone());
    let mut t = (BigInt::zero(), BigInt::one());
    let mut r = (m.clone(), BigInt::from_biguint(Sign::Plus, a_u.clone()));
    while !r.1.is_zero() {
        let q = &r.0 / &r.1;
        let f = |mut pair: (BigInt, BigInt)| {
            mem::swap(&mut pair.0, &mut pair.1);
            pair.1 -= &q * &pair.0;
            pair
        };
        r = f(r);
        t = f(t);
    }
    if !r.0.is_one() {
        return None;
    }
    if t.0 < BigInt::zero() {
        Some((t.0 + m).magnitude().clone())
    } else {
        Some(t.0.magnitude().clone())
    }
}

/// A baby-step/giant-step table for solving small-range discrete logarithms
/// with respect to a fixed `base` and `modulus`.
///
/// Sized from the caller's `max_value` bound: the table holds roughly
/// `sqrt(max_value)` entries and [`find`](DiscreteLog::find) performs at most
/// as many giant steps, so a bound of a million ballots costs ~1000 entries.
pub struct DiscreteLog {
    table: HashMap<BigUint, u64>,
    base: BigUint,
    modulus: BigUint,
    /// Number of baby steps, also the giant-step stride.
    m: u64,
}

impl DiscreteLog {
    /// Builds the table. `find` will cover at least the range `[0, max_value]`.
    pub fn new(base: &BigUint, modulus: &BigUint, max_value: u64) -> DiscreteLog {
        let base = base % modulus;
        let m = (max_value + 1).isqrt() + 1;

        let mut table = HashMap::with_capacity(m as usize);
        let mut k = BigUint::one();
        for j in 0..m {
            table.insert(k.clone(), j);
            k = (k * &base) % modulus;
        }

        DiscreteLog {
            table,
            base,
            modulus: modulus.clone(),
            m,
        }
    }

    /// Builds a table for a group generator covering `[0, max_value]`.
    pub fn from_group(base: &GroupElement, group: &Group, max_value: u64) -> DiscreteLog {
        Self::new(base.as_biguint(), group.modulus(), max_value)
    }

    /// Finds `x` with `base^x == y (mod modulus)` if `x` lies within the
    /// covered range.
    pub fn find(&self, y: &BigUint) -> Option<u64> {
        let base_to_minus_m = mod_inverse(
            &self.base.modpow(&BigUint::from(self.m), &self.modulus),
            &self.modulus,
        )?;

        let mut gamma = y % &self.modulus;
        for i in 0..=self.m {
            if let Some(j) = self.table.get(&gamma) {
                return Some(i * self.m + j);
            }
            gamma = (gamma * &base_to_minus_m) % &self.modulus;
        }
        None
    }

    /// Finds the discrete log of a group element within the covered range.
    pub fn find_element(&self, y: &GroupElement) -> Option<u64> {
        self.find(y.as_biguint())
    }
}
