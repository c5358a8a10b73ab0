// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The fixed cryptographic parameters: the field `Z_q` and group `Z_p^r`.

use serde::{Deserialize, Serialize};
use util::{
    algebra::{Group, ScalarField},
    algebra_utils::cnt_bits_repr,
    csprng::Csprng,
};

use crate::{
    errors::{VetError, VetResult},
    hash::{HValue, vet_h},
};

/// Structural properties the parameter primes were generated to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedParameterGenerationParameters {
    /// Number of bits of the field order `q`.
    pub q_bits_total: usize,

    /// Number of bits of the group modulus `p`.
    pub p_bits_total: usize,

    /// Number of leading bits of `p` fixed to 1.
    pub p_bits_msb_fixed_1: usize,

    /// Number of trailing bits of `p` fixed to 1.
    pub p_bits_lsb_fixed_1: usize,
}

/// The fixed parameters define the field and group used by every artifact of
/// a tally. They are compiled in and published under `constants.json`;
/// loading a sealed directory whose constants differ is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedParameters {
    /// Parameters used to generate the parameters.
    pub generation_parameters: FixedParameterGenerationParameters,

    /// Prime field `Z_q`.
    pub field: ScalarField,

    /// Group `Z_p^r` of order `q`, including generator `g`.
    pub group: Group,
}

impl FixedParameters {
    /// Verifies that the parameters meet basic validity requirements.
    /// Expensive (primality testing).
    pub fn validate(&self, csprng: &mut Csprng) -> VetResult<()> {
        let field = &self.field;
        let group = &self.group;

        let ok = field.is_valid(csprng)
            && group.is_valid(csprng)
            && group.matches_field(field)
            && cnt_bits_repr(field.order()) == self.generation_parameters.q_bits_total
            && cnt_bits_repr(group.modulus()) == self.generation_parameters.p_bits_total;

        if ok {
            Ok(())
        } else {
            Err(VetError::ConstantsMismatch)
        }
    }

    /// The hash binding the parameters: `H(0^32; 0x00 | p | q | g)`.
    ///
    /// Keys the rest of the hash tree, so two tallies under different
    /// parameters can never share a challenge or tracking hash.
    pub fn parameter_base_hash(&self) -> HValue {
        let mut v = vec![0x00];
        v.extend_from_slice(&self.group.modulus().to_bytes_be());
        v.extend_from_slice(&self.field.order().to_bytes_be());
        v.extend_from_slice(&self.group.generator().to_be_bytes_left_pad(&self.group));
        vet_h(&HValue::default(), &v)
    }
}
