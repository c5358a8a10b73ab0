// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The published cryptographic context of one tally.

use serde::{Deserialize, Serialize};

use crate::{
    el_gamal::ElGamalPublicKey,
    election_manifest::ElectionManifest,
    errors::VetResult,
    fixed_parameters::FixedParameters,
    hash::{HValue, vet_h},
};

/// Everything a verifier needs besides the sealed directory itself. Published
/// as `cryptographic_context.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionContext {
    /// The election public key `K`.
    pub public_key: ElGamalPublicKey,

    /// Hash binding the group parameters.
    pub parameter_hash: HValue,

    /// Hash binding the election description.
    pub manifest_hash: HValue,

    /// `H(parameter_hash; 0x02 | manifest_hash | K)`. Keys every
    /// Fiat-Shamir challenge and seeds the tracking-hash chain.
    pub base_hash: HValue,
}

impl ElectionContext {
    pub fn new(
        fixed_parameters: &FixedParameters,
        manifest: &ElectionManifest,
        public_key: ElGamalPublicKey,
    ) -> VetResult<ElectionContext> {
        let parameter_hash = fixed_parameters.parameter_base_hash();
        let manifest_hash = manifest.manifest_hash()?;

        let mut v = vec![0x02];
        v.extend_from_slice(manifest_hash.as_ref());
        v.extend_from_slice(&public_key.to_hash_bytes(fixed_parameters));
        let base_hash = vet_h(&parameter_hash, &v);

        Ok(ElectionContext {
            public_key,
            parameter_hash,
            manifest_hash,
            base_hash,
        })
    }
}
