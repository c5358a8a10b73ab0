// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Wrappers around `BigUint` separating field and group elements in the code.
//!
//! A [`ScalarField`] is the prime field `Z_q` of exponents. A [`Group`] is the
//! order-`q` multiplicative subgroup of `Z_p^*` generated by `g`. Keeping the
//! two apart at the type level prevents the classic mistake of reducing a
//! group element mod `q` or exponentiating by something that was never
//! range-checked.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{
    algebra_utils::{cnt_bits_repr, mod_inverse, to_be_bytes_left_pad},
    csprng::Csprng,
    prime::is_prime,
};

/// An element of the field `Z_q` defined by a [`ScalarField`].
///
/// Guaranteed `< q` by every constructor.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FieldElement(#[serde(with = "crate::biguint_serde")] BigUint);

/// The finite field `Z_q` of integers modulo the prime `q`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScalarField {
    /// Subgroup order.
    #[serde(with = "crate::biguint_serde")]
    q: BigUint,
}

impl FieldElement {
    /// The numeric value of the field element.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Field addition: `(self + other) mod q`.
    pub fn add(&self, other: &FieldElement, field: &ScalarField) -> Self {
        FieldElement((&self.0 + &other.0) % &field.q)
    }

    /// Field subtraction: `(self - other) mod q`.
    pub fn sub(&self, other: &FieldElement, field: &ScalarField) -> Self {
        if self.0 >= other.0 {
            FieldElement((&self.0 - &other.0) % &field.q)
        } else {
            FieldElement((&field.q - (&other.0 - &self.0)) % &field.q)
        }
    }

    /// Additive inverse: `(q - self) mod q`.
    pub fn neg(&self, field: &ScalarField) -> Self {
        ScalarField::zero().sub(self, field)
    }

    /// Field multiplication: `(self * other) mod q`.
    pub fn mul(&self, other: &FieldElement, field: &ScalarField) -> Self {
        FieldElement((&self.0 * &other.0) % &field.q)
    }

    /// The multiplicative inverse, if it exists (iff `gcd(self, q) == 1`).
    pub fn inv(&self, field: &ScalarField) -> Option<Self> {
        mod_inverse(&self.0, &field.q).map(FieldElement)
    }

    /// Creates a field element from an integer, reducing mod `q`.
    pub fn from<T>(x: T, field: &ScalarField) -> Self
    where
        BigUint: From<T>,
    {
        FieldElement(BigUint::from(x) % &field.q)
    }

    /// Creates a field element from big-endian bytes, reducing mod `q`.
    pub fn from_bytes_be(x: &[u8], field: &ScalarField) -> Self {
        FieldElement(BigUint::from_bytes_be(x) % &field.q)
    }

    /// Big-endian encoding left-padded to the byte length of `q`.
    pub fn to_be_bytes_left_pad(&self, field: &ScalarField) -> Vec<u8> {
        to_be_bytes_left_pad(&self.0, field.q_len_bytes())
    }

    /// Returns true iff the element is zero.
    pub fn is_zero(&self) -> bool {
        BigUint::is_zero(&self.0)
    }

    /// Returns true iff `0 <= self < q`.
    ///
    /// The lower bound holds by unsignedness, so only the upper bound is
    /// actually checked.
    pub fn is_valid(&self, field: &ScalarField) -> bool {
        self.0 < field.q
    }
}

impl Zeroize for FieldElement {
    fn zeroize(&mut self) {
        // BigUint offers no in-place scrubbing, so overwrite with zero and
        // let the old allocation drop.
        self.0 = BigUint::zero();
    }
}

impl ScalarField {
    /// Constructs a scalar field, returning `None` if the order is not prime.
    ///
    /// The primality check is expensive. Construct a field once and reuse it,
    /// or use trusted fixed parameters with [`ScalarField::new_unchecked`].
    pub fn new(order: BigUint, csprng: &mut Csprng) -> Option<Self> {
        let f = ScalarField { q: order };
        f.is_valid(csprng).then_some(f)
    }

    /// Constructs a scalar field *assuming* the given order is prime.
    pub fn new_unchecked(order: BigUint) -> Self {
        ScalarField { q: order }
    }

    /// Validates the field by checking that the order is prime. Expensive.
    pub fn is_valid(&self, csprng: &mut Csprng) -> bool {
        is_prime(&self.q, csprng)
    }

    /// One, the multiplicative neutral element, as a field element.
    pub fn one() -> FieldElement {
        FieldElement(BigUint::one())
    }

    /// Zero, the additive neutral element, as a field element.
    pub fn zero() -> FieldElement {
        FieldElement(BigUint::zero())
    }

    /// A uniform random field element in `[0, q)`.
    pub fn random_field_elem(&self, csprng: &mut Csprng) -> FieldElement {
        FieldElement(csprng.next_biguint_lt(&self.q))
    }

    /// The order `q` of the field.
    pub fn order(&self) -> &BigUint {
        &self.q
    }

    /// The byte length of the encoding of field order `q`.
    pub fn q_len_bytes(&self) -> usize {
        cnt_bits_repr(&self.q).div_ceil(8)
    }
}

/// An element of the multiplicative subgroup defined by a [`Group`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GroupElement(#[serde(with = "crate::biguint_serde")] BigUint);

/// The multiplicative subgroup of `Z_p^*` of prime order `q` with generator `g`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    /// Prime modulus `p`.
    #[serde(with = "crate::biguint_serde")]
    p: BigUint,

    /// Subgroup generator `g`.
    #[serde(with = "crate::biguint_serde")]
    g: BigUint,

    /// Subgroup order `q`.
    #[serde(with = "crate::biguint_serde")]
    q: BigUint,
}

impl GroupElement {
    /// Subgroup multiplication: `(self * other) mod p`.
    pub fn mul(&self, other: &GroupElement, group: &Group) -> GroupElement {
        GroupElement((&self.0 * &other.0) % &group.p)
    }

    /// The multiplicative inverse mod `p`.
    ///
    /// Always `Some` for valid group elements.
    pub fn inv(&self, group: &Group) -> Option<Self> {
        mod_inverse(&self.0, &group.p).map(GroupElement)
    }

    /// Modular exponentiation by an integer exponent.
    pub fn pow(&self, exponent: impl Into<BigUint>, group: &Group) -> GroupElement {
        GroupElement(self.0.modpow(&exponent.into(), &group.p))
    }

    /// Modular exponentiation by a field element, the action of `Z_q` on the group.
    pub fn exp(&self, exponent: &FieldElement, group: &Group) -> GroupElement {
        GroupElement(self.0.modpow(&exponent.0, &group.p))
    }

    /// Returns true iff `0 <= self < p` and `self^q == 1 (mod p)`.
    pub fn is_valid(&self, group: &Group) -> bool {
        let elem_less_than_p = self.0 < group.p;
        let elem_has_order_dividing_q = self.0.modpow(&group.q, &group.p).is_one();
        elem_less_than_p && elem_has_order_dividing_q
    }

    /// Big-endian encoding left-padded to the byte length of `p`.
    pub fn to_be_bytes_left_pad(&self, group: &Group) -> Vec<u8> {
        to_be_bytes_left_pad(&self.0, group.p_len_bytes())
    }

    /// The element as a plain `BigUint`.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl Group {
    /// Constructs a group from modulus `p`, order `q`, and generator `g`,
    /// checking validity according to [`Group::is_valid`]. Expensive;
    /// construct once and reuse, or use trusted fixed parameters with
    /// [`Group::new_unchecked`].
    pub fn new(
        modulus: BigUint,
        order: BigUint,
        generator: BigUint,
        csprng: &mut Csprng,
    ) -> Option<Self> {
        let group = Group {
            p: modulus,
            g: generator,
            q: order,
        };
        group.is_valid(csprng).then_some(group)
    }

    /// Constructs a group without validity checking.
    pub fn new_unchecked(modulus: BigUint, order: BigUint, generator: BigUint) -> Self {
        Group {
            p: modulus,
            g: generator,
            q: order,
        }
    }

    /// Validates the group. Expensive.
    ///
    /// A group is valid if `p` and `q` are prime, `q` divides `p-1` but not
    /// the cofactor `(p-1)/q`, the generator has order `q`, and the cofactor
    /// is even.
    pub fn is_valid(&self, csprng: &mut Csprng) -> bool {
        let p_minus_1 = &self.p - BigUint::one();
        let cofactor = &p_minus_1 / &self.q;
        if !(p_minus_1 % &self.q).is_zero() || (&cofactor % &self.q).is_zero() {
            return false;
        }

        // Order of `g` at most `q` and `g != 1`; with prime `q` this makes
        // the order exactly `q`.
        if self.g.is_one() || !self.g.modpow(&self.q, &self.p).is_one() {
            return false;
        }

        // An odd cofactor rules out a safe construction (e.g. p=7, q=2).
        if cofactor.is_odd() {
            return false;
        }

        // Primality testing last, it dominates the cost.
        is_prime(&self.q, csprng) && is_prime(&self.p, csprng)
    }

    /// A uniform random group element `g^x` for `x` uniform in `[0, q)`.
    pub fn random_group_elem(&self, csprng: &mut Csprng) -> GroupElement {
        self.g_exp(&FieldElement(csprng.next_biguint_lt(&self.q)))
    }

    /// The generator raised to a field element: `g^x mod p`.
    pub fn g_exp(&self, x: &FieldElement) -> GroupElement {
        GroupElement(self.g.modpow(&x.0, &self.p))
    }

    /// One, the neutral element, as a group element.
    pub fn one() -> GroupElement {
        GroupElement(BigUint::one())
    }

    /// The order `q` of the group.
    pub fn order(&self) -> &BigUint {
        &self.q
    }

    /// The modulus `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.p
    }

    /// The generator `g` as a group element.
    pub fn generator(&self) -> GroupElement {
        GroupElement(self.g.clone())
    }

    /// The byte length of the encoding of modulus `p`.
    pub fn p_len_bytes(&self) -> usize {
        cnt_bits_repr(&self.p).div_ceil(8)
    }

    /// Returns true iff the group and field share the same order.
    pub fn matches_field(&self, field: &ScalarField) -> bool {
        self.q == field.q
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    // Toy parameters: q = 127, p = 59183 = 2 * 233 * 127 + 1, g of order 127.
    fn toy_algebras() -> (ScalarField, Group) {
        (
            ScalarField::new_unchecked(BigUint::from(127_u8)),
            Group::new_unchecked(
                BigUint::from(59183_u32),
                BigUint::from(127_u8),
                BigUint::from(32616_u32),
            ),
        )
    }

    #[test]
    fn field_operations() {
        let (field, _) = toy_algebras();

        let a = FieldElement::from(115_u8, &field);
        let b = FieldElement::from(37_u8, &field);

        assert_eq!(a, FieldElement::from(242_u8, &field));
        assert_eq!(a.add(&b, &field), FieldElement::from(25_u8, &field));
        assert_eq!(a.sub(&b, &field), FieldElement::from(78_u8, &field));
        assert_eq!(b.sub(&a, &field), FieldElement::from(49_u8, &field));
        assert_eq!(b.sub(&b, &field), ScalarField::zero());
        assert_eq!(a.neg(&field), FieldElement::from(12_u8, &field));
        assert_eq!(a.mul(&b, &field), FieldElement::from(64_u8, &field));

        let a_inv = a.inv(&field).unwrap();
        assert_eq!(a.mul(&a_inv, &field), ScalarField::one());
    }

    #[test]
    fn group_operations() {
        let mut csprng = Csprng::new(b"testing group operations");
        let (field, group) = toy_algebras();

        let a = FieldElement::from(115_u8, &field);
        let g1 = group.g_exp(&a);
        assert!(g1.is_valid(&group));

        let g1_inv = g1.inv(&group).unwrap();
        assert_eq!(g1.mul(&g1_inv, &group), Group::one());

        // g^14 agrees whether computed via pow or exp.
        let g = group.generator();
        assert_eq!(
            g.pow(14_u32, &group),
            g.exp(&FieldElement::from(14_u8, &field), &group)
        );

        for _ in 0..50 {
            let u = group.random_group_elem(&mut csprng);
            assert!(u.is_valid(&group));
        }

        // Not every residue lies in the subgroup.
        let h = GroupElement(BigUint::from(12345_u32));
        assert!(!h.is_valid(&group));
    }

    #[test]
    fn field_group_validity() {
        let mut csprng = Csprng::new(b"testing validity");
        let (field, group) = toy_algebras();

        assert!(field.is_valid(&mut csprng));
        assert!(group.is_valid(&mut csprng));
        assert!(group.matches_field(&field));

        let invalid_field = ScalarField::new_unchecked(BigUint::from(125_u8));
        assert!(!invalid_field.is_valid(&mut csprng));
        assert!(!group.matches_field(&invalid_field));

        let invalid_modulus_group = Group::new_unchecked(
            BigUint::from(59185_u32),
            BigUint::from(127_u8),
            BigUint::from(32616_u32),
        );
        assert!(!invalid_modulus_group.is_valid(&mut csprng));

        let invalid_generator_group = Group::new_unchecked(
            BigUint::from(59183_u32),
            BigUint::from(127_u8),
            BigUint::one(),
        );
        assert!(!invalid_generator_group.is_valid(&mut csprng));
    }

    #[test]
    fn element_encoding() {
        let (field, group) = toy_algebras();

        let u = FieldElement::from(65_u8, &field);
        assert_eq!(u.to_be_bytes_left_pad(&field), vec![65_u8]);

        let v = group.g_exp(&u);
        assert_eq!(v.to_be_bytes_left_pad(&group).len(), group.p_len_bytes());
    }
}
