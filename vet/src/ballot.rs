// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Plaintext and ciphertext ballot structures.
//!
//! A plaintext ballot exists only in memory between CVR parsing and
//! encryption; it is never persisted. A ciphertext ballot is written once
//! through the manifest and read back only for verification or audit
//! reconciliation.

use serde::{Deserialize, Serialize};

use crate::{
    ciphertext::Ciphertext,
    context::ElectionContext,
    election_manifest::ElectionManifest,
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    hash::{HValue, vet_h},
    zk::ProofRange,
};

/// A voter's 0/1 choice on one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextSelection {
    /// The option's object id from the election description.
    pub object_id: String,

    /// 0 or 1. Validated before encryption; anything else is fatal.
    pub vote: u64,

    /// The unencrypted text of a write-in, if any.
    pub write_in: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextContest {
    /// The contest's object id from the election description.
    pub object_id: String,

    /// Exactly the contest's options, in manifest order.
    pub selections: Vec<PlaintextSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextBallot {
    /// Stable ballot identifier, `b` + 7-digit sequence number.
    pub object_id: String,

    /// The imprinted id connecting this ballot to its paper original.
    pub imprinted_id: Option<String>,

    /// The contests present on this ballot. A ballot need not contain every
    /// contest of the election.
    pub contests: Vec<PlaintextContest>,
}

impl PlaintextBallot {
    /// Checks the ballot against the election description: every contest and
    /// option known, selections covering each contest's options exactly and
    /// in order, all values 0/1, and each contest within its vote-for limit.
    ///
    /// Every violation is an [`ErrorKind::InputMalformed`](crate::errors::ErrorKind)
    /// error, raised before any encryption work is spent on the ballot.
    pub fn validate(&self, election: &ElectionManifest) -> VetResult<()> {
        for contest in &self.contests {
            let Some(manifest_contest) = election.contest_by_id(&contest.object_id) else {
                return Err(VetError::ContestNotInElection {
                    ballot_id: self.object_id.clone(),
                    contest: contest.object_id.clone(),
                });
            };

            if contest.selections.len() != manifest_contest.options.len()
                || contest
                    .selections
                    .iter()
                    .zip(&manifest_contest.options)
                    .any(|(s, o)| s.object_id != o.object_id)
            {
                return Err(VetError::SelectionsDontMatchContest {
                    ballot_id: self.object_id.clone(),
                    contest: manifest_contest.label.clone(),
                });
            }

            let mut sum = 0u64;
            for selection in &contest.selections {
                if selection.vote > 1 {
                    return Err(VetError::SelectionValueOutOfRange {
                        ballot_id: self.object_id.clone(),
                        contest: manifest_contest.label.clone(),
                        option: selection.object_id.clone(),
                        value: selection.vote,
                    });
                }
                sum += selection.vote;
            }

            if sum > manifest_contest.selection_limit as u64 {
                return Err(VetError::OvervotedContest {
                    ballot_id: self.object_id.clone(),
                    contest: manifest_contest.label.clone(),
                    sum,
                    limit: manifest_contest.selection_limit,
                });
            }
        }

        Ok(())
    }
}

/// An encrypted 0/1 selection with its disjunctive proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextSelection {
    pub object_id: String,

    pub ciphertext: Ciphertext,

    /// Proof that the ciphertext encrypts 0 or 1.
    pub proof: ProofRange,

    /// Unencrypted write-in payload, carried verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_in: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextContest {
    pub object_id: String,

    pub selections: Vec<CiphertextSelection>,

    /// The homomorphic sum of this contest's selection ciphertexts.
    pub selection_sum: Ciphertext,

    /// Proof that the sum encrypts a value in `[0, k]`.
    pub sum_proof: ProofRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallot {
    pub object_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imprinted_id: Option<String>,

    /// Caller-supplied encryption timestamp (seconds). Part of the tracking
    /// chain, so it must be an input, not wall-clock sampled, for runs to be
    /// reproducible.
    pub timestamp: u64,

    /// Hash of this ballot's cryptographic payload.
    pub crypto_hash: HValue,

    /// Chained hash linking this ballot to its predecessor in object-id
    /// order. The placeholder zero value until the chain pass runs.
    pub tracking_hash: HValue,

    pub contests: Vec<CiphertextContest>,
}

impl CiphertextBallot {
    /// Recomputes the crypto hash from the ballot's contents:
    /// `H(base_hash; 0x03 | object_id | contest ids and ciphertexts...)`.
    pub fn compute_crypto_hash(
        fixed_parameters: &FixedParameters,
        base_hash: &HValue,
        object_id: &str,
        contests: &[CiphertextContest],
    ) -> HValue {
        let group = &fixed_parameters.group;

        let mut v = vec![0x03];
        v.extend_from_slice(object_id.as_bytes());
        for contest in contests {
            v.extend_from_slice(contest.object_id.as_bytes());
            for selection in &contest.selections {
                v.extend_from_slice(&selection.ciphertext.to_hash_bytes(group));
            }
            v.extend_from_slice(&contest.selection_sum.to_hash_bytes(group));
        }
        vet_h(base_hash, &v)
    }

    /// Verifies this ballot's proofs: every selection's 0/1 proof, every
    /// contest's selection-limit proof, the consistency of each stored sum
    /// with the product of its selections, and the stored crypto hash.
    pub fn verify_proofs(
        &self,
        fixed_parameters: &FixedParameters,
        context: &ElectionContext,
        election: &ElectionManifest,
    ) -> VetResult<()> {
        let group = &fixed_parameters.group;
        let public_key = &context.public_key;

        for contest in &self.contests {
            let Some(manifest_contest) = election.contest_by_id(&contest.object_id) else {
                return Err(VetError::ContestNotInElection {
                    ballot_id: self.object_id.clone(),
                    contest: contest.object_id.clone(),
                });
            };

            let mut sum = Ciphertext::one();
            for selection in &contest.selections {
                if !selection.ciphertext.is_valid(group) {
                    return Err(VetError::CiphertextNotInGroup {
                        ballot_id: self.object_id.clone(),
                    });
                }
                if !selection.proof.verify(
                    fixed_parameters,
                    &context.base_hash,
                    public_key,
                    &selection.ciphertext,
                    1,
                ) {
                    return Err(VetError::SelectionProofInvalid {
                        ballot_id: self.object_id.clone(),
                        contest: manifest_contest.label.clone(),
                        option: selection.object_id.clone(),
                    });
                }
                sum = sum.mul(&selection.ciphertext, group);
            }

            if sum != contest.selection_sum
                || !contest.sum_proof.verify(
                    fixed_parameters,
                    &context.base_hash,
                    public_key,
                    &contest.selection_sum,
                    manifest_contest.selection_limit as u64,
                )
            {
                return Err(VetError::ContestLimitProofInvalid {
                    ballot_id: self.object_id.clone(),
                    contest: manifest_contest.label.clone(),
                });
            }
        }

        let expected = Self::compute_crypto_hash(
            fixed_parameters,
            &context.base_hash,
            &self.object_id,
            &self.contests,
        );
        if expected != self.crypto_hash {
            return Err(VetError::BallotHashMismatch {
                ballot_id: self.object_id.clone(),
            });
        }

        Ok(())
    }
}
