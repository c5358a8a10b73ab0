// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Decryption of aggregate ciphertexts with proofs of correct decryption.
//!
//! For each aggregate `(alpha, beta)` the prover computes the share
//! `M = alpha^s`, recovers `g^t = beta * M^{-1}`, and solves the small-range
//! discrete logarithm for the count `t` (bounded by the number of ballots
//! containing the contest, so baby-step/giant-step is cheap). The published
//! [`ProofDecryption`] convinces a verifier that `M` was formed with the
//! secret behind the public key, without revealing the secret.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use util::{algebra::GroupElement, algebra_utils::DiscreteLog, csprng::Csprng};

use crate::{
    ciphertext::Ciphertext,
    context::ElectionContext,
    el_gamal::ElGamalSecretKey,
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    hash::HValue,
    tally::TallyMap,
    zk::ProofDecryption,
};

/// The decrypted tally for one (contest, selection) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalliedSelection {
    /// Number of ballots that selected this option.
    pub count: u64,

    /// The aggregate ciphertext this count was decrypted from.
    pub ciphertext: Ciphertext,

    /// The partial decryption `M = alpha^s`.
    pub share: GroupElement,

    /// Proof that `(g, K, alpha, M)` is a DDH tuple.
    pub proof: ProofDecryption,
}

/// The decrypted tally: selection object id to its count and evidence.
/// Published as `encrypted_tally.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTally {
    pub selections: BTreeMap<String, TalliedSelection>,
}

/// Decrypts every aggregate in `tally_map` and attaches decryption proofs.
///
/// `bounds` gives the per-key search bound (the number of ballots containing
/// the key's contest). Proof randomness is derived from `master_seed` so that
/// a re-run with identical inputs publishes identical bytes.
pub fn decrypt_tally(
    fixed_parameters: &FixedParameters,
    context: &ElectionContext,
    secret_key: &ElGamalSecretKey,
    tally_map: &TallyMap,
    bounds: &BTreeMap<String, u64>,
    master_seed: &HValue,
) -> VetResult<SelectionTally> {
    let group = &fixed_parameters.group;

    let max_bound = bounds.values().copied().max().unwrap_or(0);
    let dlog = DiscreteLog::from_group(&group.generator(), group, max_bound);

    let selections = tally_map
        .par_iter()
        .map(|(key, aggregate)| {
            let bound = bounds.get(key).copied().unwrap_or(max_bound);

            let share = secret_key.decryption_share(fixed_parameters, aggregate);
            let share_inv = share
                .inv(group)
                .ok_or_else(|| VetError::ShareNotInvertible { key: key.clone() })?;
            let g_to_t = aggregate.beta.mul(&share_inv, group);

            let count = dlog
                .find_element(&g_to_t)
                .filter(|&t| t <= bound)
                .ok_or_else(|| VetError::DiscreteLogNotFound {
                    key: key.clone(),
                    bound,
                })?;

            let mut csprng = Csprng::with_tags([
                b"decryption proof randomness".as_slice(),
                master_seed.as_ref(),
                key.as_bytes(),
            ]);
            let proof = ProofDecryption::new(
                fixed_parameters,
                &context.base_hash,
                &mut csprng,
                &context.public_key,
                aggregate,
                &share,
                secret_key.s(),
            );

            debug!(key, count, "decrypted aggregate");

            Ok((
                key.clone(),
                TalliedSelection {
                    count,
                    ciphertext: aggregate.clone(),
                    share,
                    proof,
                },
            ))
        })
        .collect::<VetResult<BTreeMap<_, _>>>()?;

    Ok(SelectionTally { selections })
}
