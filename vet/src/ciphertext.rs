// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use serde::{Deserialize, Serialize};

use util::algebra::{FieldElement, Group, GroupElement};

use crate::{el_gamal::ElGamalPublicKey, fixed_parameters::FixedParameters};

/// An ElGamal ciphertext `(alpha, beta) = (g^r, K^r * g^v)`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq)]
pub struct Ciphertext {
    pub alpha: GroupElement,
    pub beta: GroupElement,
}

impl Ciphertext {
    /// The ciphertext with alpha and beta equal to 1, the neutral element of
    /// component-wise multiplication. The correct seed for any homomorphic
    /// reduction.
    pub fn one() -> Ciphertext {
        Ciphertext {
            alpha: Group::one(),
            beta: Group::one(),
        }
    }

    /// Component-wise product. By the homomorphic property this encrypts the
    /// sum of the two plaintexts.
    pub fn mul(&self, other: &Ciphertext, group: &Group) -> Ciphertext {
        Ciphertext {
            alpha: self.alpha.mul(&other.alpha, group),
            beta: self.beta.mul(&other.beta, group),
        }
    }

    /// Returns true iff both components lie in the subgroup.
    pub fn is_valid(&self, group: &Group) -> bool {
        self.alpha.is_valid(group) && self.beta.is_valid(group)
    }

    /// Canonical byte encoding for hashing: `alpha | beta`, each left-padded
    /// to the byte length of `p`.
    pub fn to_hash_bytes(&self, group: &Group) -> Vec<u8> {
        let mut v = self.alpha.to_be_bytes_left_pad(group);
        v.extend_from_slice(&self.beta.to_be_bytes_left_pad(group));
        v
    }

    /// Decrypts with a known encryption nonce `r`: recovers `g^v` as
    /// `beta * (K^r)^{-1}` and matches `v` against `0..=max_value` by
    /// enumeration. Returns `None` if no value in range matches (the nonce is
    /// wrong, or the ciphertext was tampered with).
    pub fn decrypt_with_nonce(
        &self,
        fixed_parameters: &FixedParameters,
        public_key: &ElGamalPublicKey,
        nonce: &FieldElement,
        max_value: u64,
    ) -> Option<u64> {
        let group = &fixed_parameters.group;

        let k_to_r = public_key.k.exp(nonce, group);
        let g_to_v = self.beta.mul(&k_to_r.inv(group)?, group);

        let mut candidate = Group::one();
        let g = group.generator();
        for v in 0..=max_value {
            if candidate == g_to_v {
                return Some(v);
            }
            candidate = candidate.mul(&g, group);
        }
        None
    }
}

impl PartialEq for Ciphertext {
    fn eq(&self, other: &Self) -> bool {
        self.alpha == other.alpha && self.beta == other.beta
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use util::csprng::Csprng;

    use super::*;
    use crate::{el_gamal::ElGamalSecretKey, standard_parameters::toy_parameters_q64p256};

    #[test]
    fn encrypt_decrypt_known_nonce() {
        let fp = toy_parameters_q64p256();
        let mut csprng = Csprng::new(b"ciphertext round trip");

        let secret = ElGamalSecretKey::generate(&mut csprng, &fp);
        let public = secret.public_key(&fp);

        for v in [0u64, 1, 2, 5] {
            let r = fp.field.random_field_elem(&mut csprng);
            let ct = public.encrypt(&fp, &r, v);
            assert!(ct.is_valid(&fp.group));
            assert_eq!(ct.decrypt_with_nonce(&fp, &public, &r, 5), Some(v));
        }
    }

    #[test]
    fn homomorphic_product() {
        let fp = toy_parameters_q64p256();
        let mut csprng = Csprng::new(b"homomorphic product");

        let secret = ElGamalSecretKey::generate(&mut csprng, &fp);
        let public = secret.public_key(&fp);

        let r1 = fp.field.random_field_elem(&mut csprng);
        let r2 = fp.field.random_field_elem(&mut csprng);
        let ct1 = public.encrypt(&fp, &r1, 1);
        let ct2 = public.encrypt(&fp, &r2, 1);

        let product = ct1.mul(&ct2, &fp.group);
        let r_sum = r1.add(&r2, &fp.field);
        assert_eq!(product.decrypt_with_nonce(&fp, &public, &r_sum, 4), Some(2));
    }

    #[test]
    fn wrong_nonce_decrypts_to_nothing() {
        let fp = toy_parameters_q64p256();
        let mut csprng = Csprng::new(b"wrong nonce");

        let secret = ElGamalSecretKey::generate(&mut csprng, &fp);
        let public = secret.public_key(&fp);

        let r = fp.field.random_field_elem(&mut csprng);
        let wrong = fp.field.random_field_elem(&mut csprng);
        let ct = public.encrypt(&fp, &r, 1);
        assert_eq!(ct.decrypt_with_nonce(&fp, &public, &wrong, 4), None);
    }
}
