// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Non-interactive zero-knowledge proofs over ciphertexts.
//!
//! [`ProofRange`] is a disjunctive Chaum-Pedersen proof that a ciphertext
//! encrypts an integer in `[0, limit]`: with `limit = 1` it is the per-selection
//! 0-or-1 proof, with `limit = k` it is the contest selection-limit proof over
//! the homomorphic sum. [`ProofDecryption`] is the Chaum-Pedersen proof that
//! `(g, K, alpha, M)` is a DDH tuple, i.e. that a published decryption share
//! `M = alpha^s` was produced with the secret behind `K`.
//!
//! Challenges are Fiat-Shamir, keyed by the election base hash so proofs are
//! bound to one election.

use serde::{Deserialize, Serialize};

use util::{
    algebra::{FieldElement, GroupElement, ScalarField},
    csprng::Csprng,
};

use crate::{
    ciphertext::Ciphertext,
    el_gamal::ElGamalPublicKey,
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    hash::{HValue, vet_h_q},
};

/// One disjunct of a [`ProofRange`]: challenge share and response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofRangeSingle {
    pub c: FieldElement,
    pub v: FieldElement,
}

/// Proof that a ciphertext encrypts a value in `[0, limit]`, one disjunct per
/// candidate value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofRange(Vec<ProofRangeSingle>);

impl ProofRange {
    /// The Fiat-Shamir challenge over the commit messages.
    ///
    /// `c = H(base_hash; 0x21 | K | alpha | beta | a_0 | .. | a_L | b_0 | .. | b_L) mod q`
    fn challenge(
        fixed_parameters: &FixedParameters,
        base_hash: &HValue,
        public_key: &ElGamalPublicKey,
        ct: &Ciphertext,
        a: &[GroupElement],
        b: &[GroupElement],
    ) -> FieldElement {
        let group = &fixed_parameters.group;

        let mut v = vec![0x21];
        v.extend_from_slice(&public_key.k.to_be_bytes_left_pad(group));
        v.extend_from_slice(&ct.alpha.to_be_bytes_left_pad(group));
        v.extend_from_slice(&ct.beta.to_be_bytes_left_pad(group));
        for a_j in a {
            v.extend_from_slice(&a_j.to_be_bytes_left_pad(group));
        }
        for b_j in b {
            v.extend_from_slice(&b_j.to_be_bytes_left_pad(group));
        }

        vet_h_q(base_hash, &v, &fixed_parameters.field)
    }

    /// The simulated commitments for disjunct `j` given `(c_j, v_j)`, exactly
    /// as the verifier recomputes them:
    ///
    /// `a_j = g^{v_j} * alpha^{c_j}`, `b_j = K^{v_j} * beta^{c_j} * g^{-j*c_j}`
    fn disjunct_commitments(
        fixed_parameters: &FixedParameters,
        public_key: &ElGamalPublicKey,
        ct: &Ciphertext,
        j: usize,
        c_j: &FieldElement,
        v_j: &FieldElement,
    ) -> (GroupElement, GroupElement) {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;

        let a_j = group.g_exp(v_j).mul(&ct.alpha.exp(c_j, group), group);

        let neg_j_c_j = FieldElement::from(j, field).mul(c_j, field).neg(field);
        let b_j = public_key
            .k
            .exp(v_j, group)
            .mul(&ct.beta.exp(c_j, group), group)
            .mul(&group.g_exp(&neg_j_c_j), group);

        (a_j, b_j)
    }

    /// Computes a range proof for a ciphertext of `value` encrypted with
    /// `nonce`, for the range `[0, limit]`.
    ///
    /// All disjuncts other than `value` are simulated with random challenge
    /// shares and responses; the real disjunct's challenge share is fixed last
    /// so the shares sum to the Fiat-Shamir challenge.
    pub fn new(
        fixed_parameters: &FixedParameters,
        base_hash: &HValue,
        csprng: &mut Csprng,
        public_key: &ElGamalPublicKey,
        ct: &Ciphertext,
        nonce: &FieldElement,
        value: u64,
        limit: u64,
    ) -> VetResult<ProofRange> {
        if value > limit {
            return Err(VetError::ProofValueOutOfRange { value, limit });
        }

        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;

        let cnt_disjuncts = (limit + 1) as usize;
        let real = value as usize;

        let mut c = vec![ScalarField::zero(); cnt_disjuncts];
        let mut v = vec![ScalarField::zero(); cnt_disjuncts];
        let mut a = Vec::with_capacity(cnt_disjuncts);
        let mut b = Vec::with_capacity(cnt_disjuncts);

        let u = field.random_field_elem(csprng);

        for j in 0..cnt_disjuncts {
            if j == real {
                a.push(group.g_exp(&u));
                b.push(public_key.k.exp(&u, group));
            } else {
                c[j] = field.random_field_elem(csprng);
                v[j] = field.random_field_elem(csprng);
                let (a_j, b_j) =
                    Self::disjunct_commitments(fixed_parameters, public_key, ct, j, &c[j], &v[j]);
                a.push(a_j);
                b.push(b_j);
            }
        }

        let challenge = Self::challenge(fixed_parameters, base_hash, public_key, ct, &a, &b);

        let mut c_real = challenge;
        for (j, c_j) in c.iter().enumerate() {
            if j != real {
                c_real = c_real.sub(c_j, field);
            }
        }
        v[real] = u.sub(&c_real.mul(nonce, field), field);
        c[real] = c_real;

        Ok(ProofRange(
            c.into_iter()
                .zip(v)
                .map(|(c, v)| ProofRangeSingle { c, v })
                .collect(),
        ))
    }

    /// Verifies the proof against a ciphertext and range `[0, limit]`.
    pub fn verify(
        &self,
        fixed_parameters: &FixedParameters,
        base_hash: &HValue,
        public_key: &ElGamalPublicKey,
        ct: &Ciphertext,
        limit: u64,
    ) -> bool {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;

        let cnt_disjuncts = (limit + 1) as usize;
        if self.0.len() != cnt_disjuncts {
            return false;
        }

        if !ct.alpha.is_valid(group) || !ct.beta.is_valid(group) {
            return false;
        }

        let mut a = Vec::with_capacity(cnt_disjuncts);
        let mut b = Vec::with_capacity(cnt_disjuncts);
        for (j, pf) in self.0.iter().enumerate() {
            if !pf.c.is_valid(field) || !pf.v.is_valid(field) {
                return false;
            }
            let (a_j, b_j) =
                Self::disjunct_commitments(fixed_parameters, public_key, ct, j, &pf.c, &pf.v);
            a.push(a_j);
            b.push(b_j);
        }

        let challenge = Self::challenge(fixed_parameters, base_hash, public_key, ct, &a, &b);

        let sum = self
            .0
            .iter()
            .fold(ScalarField::zero(), |acc, pf| acc.add(&pf.c, field));
        sum == challenge
    }
}

/// Chaum-Pedersen proof that `(g, K, alpha, M)` is a DDH tuple: the prover
/// knows `s` with `K = g^s` and `M = alpha^s`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofDecryption {
    pub c: FieldElement,
    pub v: FieldElement,
}

impl ProofDecryption {
    /// `c = H(base_hash; 0x30 | K | alpha | beta | a | b | M) mod q`
    fn challenge(
        fixed_parameters: &FixedParameters,
        base_hash: &HValue,
        public_key: &ElGamalPublicKey,
        ct: &Ciphertext,
        a: &GroupElement,
        b: &GroupElement,
        m: &GroupElement,
    ) -> FieldElement {
        let group = &fixed_parameters.group;

        let mut v = vec![0x30];
        v.extend_from_slice(&public_key.k.to_be_bytes_left_pad(group));
        v.extend_from_slice(&ct.alpha.to_be_bytes_left_pad(group));
        v.extend_from_slice(&ct.beta.to_be_bytes_left_pad(group));
        v.extend_from_slice(&a.to_be_bytes_left_pad(group));
        v.extend_from_slice(&b.to_be_bytes_left_pad(group));
        v.extend_from_slice(&m.to_be_bytes_left_pad(group));

        vet_h_q(base_hash, &v, &fixed_parameters.field)
    }

    /// Proves that `m = alpha^s` for the secret `s` behind `public_key`.
    pub fn new(
        fixed_parameters: &FixedParameters,
        base_hash: &HValue,
        csprng: &mut Csprng,
        public_key: &ElGamalPublicKey,
        ct: &Ciphertext,
        m: &GroupElement,
        s: &FieldElement,
    ) -> ProofDecryption {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;

        let u = field.random_field_elem(csprng);
        let a = group.g_exp(&u);
        let b = ct.alpha.exp(&u, group);

        let c = Self::challenge(fixed_parameters, base_hash, public_key, ct, &a, &b, m);
        let v = u.sub(&c.mul(s, field), field);

        ProofDecryption { c, v }
    }

    /// Verifies the proof: recomputes `a = g^v * K^c` and `b = alpha^v * M^c`
    /// and checks the challenge.
    pub fn verify(
        &self,
        fixed_parameters: &FixedParameters,
        base_hash: &HValue,
        public_key: &ElGamalPublicKey,
        ct: &Ciphertext,
        m: &GroupElement,
    ) -> bool {
        let field = &fixed_parameters.field;
        let group = &fixed_parameters.group;

        if !self.c.is_valid(field) || !self.v.is_valid(field) {
            return false;
        }
        if !m.is_valid(group) || !ct.alpha.is_valid(group) || !ct.beta.is_valid(group) {
            return false;
        }

        let a = group
            .g_exp(&self.v)
            .mul(&public_key.k.exp(&self.c, group), group);
        let b = ct
            .alpha
            .exp(&self.v, group)
            .mul(&m.exp(&self.c, group), group);

        let challenge = Self::challenge(fixed_parameters, base_hash, public_key, ct, &a, &b, m);
        challenge == self.c
    }
}
