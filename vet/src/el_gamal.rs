// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! ElGamal keys over the fixed-parameter group.
//!
//! Exponential ElGamal: a value `v` encrypts under public key `K` with nonce
//! `r` as `(g^r, K^r * g^v)`, so component-wise ciphertext multiplication adds
//! plaintexts. Decryption therefore ends in a small-range discrete logarithm,
//! which is fine here because tallies are bounded by the ballot count.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use util::{
    algebra::{FieldElement, GroupElement},
    csprng::Csprng,
};

use crate::{ciphertext::Ciphertext, fixed_parameters::FixedParameters};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalPublicKey {
    /// The public element `K = g^s`.
    pub k: GroupElement,
}

impl ElGamalPublicKey {
    pub fn new(k: GroupElement) -> Self {
        Self { k }
    }

    /// Encrypts `value` with the given nonce: `(g^r, K^r * g^value)`.
    pub fn encrypt(
        &self,
        fixed_parameters: &FixedParameters,
        nonce: &FieldElement,
        value: u64,
    ) -> Ciphertext {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;

        let alpha = group.g_exp(nonce);
        let g_to_v = group.g_exp(&FieldElement::from(value, field));
        let beta = self.k.exp(nonce, group).mul(&g_to_v, group);

        Ciphertext { alpha, beta }
    }

    /// Canonical byte encoding for hashing.
    pub fn to_hash_bytes(&self, fixed_parameters: &FixedParameters) -> Vec<u8> {
        self.k.to_be_bytes_left_pad(&fixed_parameters.group)
    }
}

/// The secret scalar `s`. Zeroized on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ElGamalSecretKey {
    s: FieldElement,
}

impl ElGamalSecretKey {
    /// Wraps a caller-supplied secret. The production interface: the caller
    /// owns key custody, this crate only ever sees `s` for decryption runs.
    pub fn from_field_element(s: FieldElement) -> Self {
        Self { s }
    }

    /// Generates a fresh secret key from the given randomness source.
    pub fn generate(csprng: &mut Csprng, fixed_parameters: &FixedParameters) -> Self {
        Self {
            s: fixed_parameters.field.random_field_elem(csprng),
        }
    }

    /// Access to the secret scalar.
    pub fn s(&self) -> &FieldElement {
        &self.s
    }

    /// Computes the public key `K = g^s`.
    pub fn public_key(&self, fixed_parameters: &FixedParameters) -> ElGamalPublicKey {
        ElGamalPublicKey::new(fixed_parameters.group.g_exp(&self.s))
    }

    /// The partial decryption `M = alpha^s` of a ciphertext.
    pub fn decryption_share(
        &self,
        fixed_parameters: &FixedParameters,
        ciphertext: &Ciphertext,
    ) -> GroupElement {
        ciphertext.alpha.exp(&self.s, &fixed_parameters.group)
    }
}

impl std::fmt::Debug for ElGamalSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret.
        f.write_str("ElGamalSecretKey")
    }
}
