// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The encryption mapper: plaintext ballot in, ciphertext ballot out.
//!
//! Every encryption nonce is derived deterministically from a master seed, so
//! a run is reproducible given the same inputs and the tallying authority can
//! later re-derive any selection's nonce for audit reconciliation:
//!
//! - per-ballot seed: `xi_B = H(base_hash; 0x10 | master_seed | object_id)`
//! - per-selection nonce: `xi_ij = H(base_hash; 0x20 | xi_B | i | j) mod q`
//!
//! with `i`, `j` the 0-based contest and option positions in the election
//! description. Proof-simulation randomness comes from a SHAKE-256 stream
//! forked from the same seed; it never needs to be recovered.
//!
//! Ballot encryption is embarrassingly parallel. The tracking-hash chain is
//! deliberately not: [`chain_ballots`] runs as a serial second pass over the
//! ballots in object-id order, so the chain value is independent of how
//! encryption work was scheduled. A parallel tree-hash would change the
//! published chain; resist that optimization.

use util::{algebra::FieldElement, csprng::Csprng};

use crate::{
    ballot::{
        CiphertextBallot, CiphertextContest, CiphertextSelection, PlaintextBallot,
    },
    ciphertext::Ciphertext,
    context::ElectionContext,
    election_manifest::ElectionManifest,
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    hash::{HValue, vet_h, vet_h_q},
    zk::ProofRange,
};

pub struct BallotEncrypter<'a> {
    fixed_parameters: &'a FixedParameters,
    election: &'a ElectionManifest,
    context: &'a ElectionContext,
    master_seed: &'a HValue,
    timestamp: u64,
}

impl<'a> BallotEncrypter<'a> {
    pub fn new(
        fixed_parameters: &'a FixedParameters,
        election: &'a ElectionManifest,
        context: &'a ElectionContext,
        master_seed: &'a HValue,
        timestamp: u64,
    ) -> Self {
        Self {
            fixed_parameters,
            election,
            context,
            master_seed,
            timestamp,
        }
    }

    /// `xi_B` for a ballot.
    pub fn ballot_seed(&self, object_id: &str) -> HValue {
        let mut v = vec![0x10];
        v.extend_from_slice(self.master_seed.as_ref());
        v.extend_from_slice(object_id.as_bytes());
        vet_h(&self.context.base_hash, &v)
    }

    /// `xi_ij` for one selection.
    pub fn selection_nonce(
        &self,
        ballot_seed: &HValue,
        contest_ix: u32,
        option_ix: u32,
    ) -> FieldElement {
        let mut v = vec![0x20];
        v.extend_from_slice(ballot_seed.as_ref());
        v.extend_from_slice(&contest_ix.to_be_bytes());
        v.extend_from_slice(&option_ix.to_be_bytes());
        vet_h_q(&self.context.base_hash, &v, &self.fixed_parameters.field)
    }

    /// Encrypts one ballot: selection ciphertexts with 0/1 proofs, per-contest
    /// homomorphic sums with selection-limit proofs, and the ballot crypto
    /// hash. The tracking hash is left at its placeholder; [`chain_ballots`]
    /// fills it in.
    pub fn encrypt(&self, ballot: &PlaintextBallot) -> VetResult<CiphertextBallot> {
        ballot.validate(self.election)?;

        let fp = self.fixed_parameters;
        let field = &fp.field;
        let group = &fp.group;
        let public_key = &self.context.public_key;
        let base_hash = &self.context.base_hash;

        let ballot_seed = self.ballot_seed(&ballot.object_id);
        let mut csprng = Csprng::with_tags([
            b"ballot proof randomness".as_slice(),
            self.master_seed.as_ref(),
            ballot.object_id.as_bytes(),
        ]);

        let mut contests = Vec::with_capacity(ballot.contests.len());
        for contest in &ballot.contests {
            // Both lookups were checked by validate() above.
            let Some(contest_ix) = self.election.contest_index(&contest.object_id) else {
                return Err(VetError::ContestNotInElection {
                    ballot_id: ballot.object_id.clone(),
                    contest: contest.object_id.clone(),
                });
            };
            let Some(manifest_contest) = self.election.contest_by_id(&contest.object_id) else {
                return Err(VetError::ContestNotInElection {
                    ballot_id: ballot.object_id.clone(),
                    contest: contest.object_id.clone(),
                });
            };

            let mut selections = Vec::with_capacity(contest.selections.len());
            let mut sum_ciphertext = Ciphertext::one();
            let mut sum_nonce = FieldElement::from(0_u8, field);
            let mut sum_value = 0u64;

            for (option_ix, selection) in contest.selections.iter().enumerate() {
                let nonce = self.selection_nonce(&ballot_seed, contest_ix, option_ix as u32);
                let ciphertext = public_key.encrypt(fp, &nonce, selection.vote);
                let proof = ProofRange::new(
                    fp,
                    base_hash,
                    &mut csprng,
                    public_key,
                    &ciphertext,
                    &nonce,
                    selection.vote,
                    1,
                )?;

                sum_ciphertext = sum_ciphertext.mul(&ciphertext, group);
                sum_nonce = sum_nonce.add(&nonce, field);
                sum_value += selection.vote;

                selections.push(CiphertextSelection {
                    object_id: selection.object_id.clone(),
                    ciphertext,
                    proof,
                    write_in: selection.write_in.clone(),
                });
            }

            let sum_proof = ProofRange::new(
                fp,
                base_hash,
                &mut csprng,
                public_key,
                &sum_ciphertext,
                &sum_nonce,
                sum_value,
                manifest_contest.selection_limit as u64,
            )?;

            contests.push(CiphertextContest {
                object_id: contest.object_id.clone(),
                selections,
                selection_sum: sum_ciphertext,
                sum_proof,
            });
        }

        let crypto_hash = CiphertextBallot::compute_crypto_hash(
            fp,
            base_hash,
            &ballot.object_id,
            &contests,
        );

        Ok(CiphertextBallot {
            object_id: ballot.object_id.clone(),
            imprinted_id: ballot.imprinted_id.clone(),
            timestamp: self.timestamp,
            crypto_hash,
            tracking_hash: HValue::default(),
            contests,
        })
    }
}

/// The serial pass computing the tracking-hash chain.
///
/// Sorts the ballots by object id and links each to its predecessor:
/// `tracking_i = H(prev; 0x04 | object_id | timestamp | crypto_hash)`, with
/// the election base hash as `prev` for the first ballot. Deterministic for
/// any encryption order.
pub fn chain_ballots(ballots: &mut [CiphertextBallot], base_hash: &HValue) {
    ballots.sort_by(|a, b| a.object_id.cmp(&b.object_id));

    let mut prev = base_hash.clone();
    for ballot in ballots.iter_mut() {
        let mut v = vec![0x04];
        v.extend_from_slice(ballot.object_id.as_bytes());
        v.extend_from_slice(&ballot.timestamp.to_be_bytes());
        v.extend_from_slice(ballot.crypto_hash.as_ref());
        ballot.tracking_hash = vet_h(&prev, &v);
        prev = ballot.tracking_hash.clone();
    }
}

/// Recomputes the chain over id-sorted ballots and checks every stored
/// tracking hash. `ballots` must already be sorted by object id.
pub fn verify_chain(ballots: &[CiphertextBallot], base_hash: &HValue) -> VetResult<()> {
    let mut prev = base_hash.clone();
    for ballot in ballots {
        let mut v = vec![0x04];
        v.extend_from_slice(ballot.object_id.as_bytes());
        v.extend_from_slice(&ballot.timestamp.to_be_bytes());
        v.extend_from_slice(ballot.crypto_hash.as_ref());
        let expected = vet_h(&prev, &v);
        if expected != ballot.tracking_hash {
            return Err(VetError::TrackingChainBroken {
                ballot_id: ballot.object_id.clone(),
            });
        }
        prev = expected;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use util::csprng::Csprng;

    use super::*;
    use crate::{
        ballot::{PlaintextContest, PlaintextSelection},
        el_gamal::ElGamalSecretKey,
        election_manifest::{Contest, ContestOption},
        standard_parameters::toy_parameters_q64p256,
    };

    fn one_contest_election(k: u32, cnt_options: usize) -> ElectionManifest {
        ElectionManifest {
            title: "Encrypt Test Election".to_owned(),
            jurisdiction: None,
            contests: vec![Contest {
                object_id: "c0001".to_owned(),
                label: "C1".to_owned(),
                selection_limit: k,
                options: (1..=cnt_options)
                    .map(|j| ContestOption {
                        object_id: format!("c0001-o{j:04}"),
                        label: format!("Candidate {j}"),
                        is_write_in: false,
                    })
                    .collect(),
            }],
        }
    }

    fn ballot(object_id: &str, votes: &[u64]) -> PlaintextBallot {
        PlaintextBallot {
            object_id: object_id.to_owned(),
            imprinted_id: None,
            contests: vec![PlaintextContest {
                object_id: "c0001".to_owned(),
                selections: votes
                    .iter()
                    .enumerate()
                    .map(|(ix, &vote)| PlaintextSelection {
                        object_id: format!("c0001-o{:04}", ix + 1),
                        vote,
                        write_in: None,
                    })
                    .collect(),
            }],
        }
    }

    struct Setup {
        fp: FixedParameters,
        election: ElectionManifest,
        context: ElectionContext,
        seed: HValue,
    }

    fn setup(k: u32, cnt_options: usize) -> Setup {
        let fp = toy_parameters_q64p256();
        let election = one_contest_election(k, cnt_options);
        let mut csprng = Csprng::new(b"encrypt test keys");
        let public = ElGamalSecretKey::generate(&mut csprng, &fp).public_key(&fp);
        let context = ElectionContext::new(&fp, &election, public).unwrap();
        let seed = vet_h(&HValue::default(), b"encrypt test seed");
        Setup {
            fp,
            election,
            context,
            seed,
        }
    }

    #[test]
    fn encrypted_ballot_proofs_verify() {
        let s = setup(2, 3);
        let encrypter = BallotEncrypter::new(&s.fp, &s.election, &s.context, &s.seed, 0);

        let eb = encrypter.encrypt(&ballot("b0000001", &[1, 1, 0])).unwrap();
        eb.verify_proofs(&s.fp, &s.context, &s.election).unwrap();
    }

    #[test]
    fn overvote_rejected_before_encryption() {
        let s = setup(1, 3);
        let encrypter = BallotEncrypter::new(&s.fp, &s.election, &s.context, &s.seed, 0);

        let err = encrypter
            .encrypt(&ballot("b0000001", &[1, 1, 0]))
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InputMalformed);
    }

    #[test]
    fn non_binary_selection_rejected() {
        let s = setup(2, 2);
        let encrypter = BallotEncrypter::new(&s.fp, &s.election, &s.context, &s.seed, 0);

        let err = encrypter
            .encrypt(&ballot("b0000001", &[2, 0]))
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InputMalformed);
    }

    #[test]
    fn same_seed_same_ciphertexts() {
        let s = setup(1, 2);
        let encrypter = BallotEncrypter::new(&s.fp, &s.election, &s.context, &s.seed, 0);

        let a = encrypter.encrypt(&ballot("b0000001", &[1, 0])).unwrap();
        let b = encrypter.encrypt(&ballot("b0000001", &[1, 0])).unwrap();
        assert_eq!(a, b);

        // A different ballot id yields different nonces, so different ciphertexts.
        let c = encrypter.encrypt(&ballot("b0000002", &[1, 0])).unwrap();
        assert_ne!(
            a.contests[0].selections[0].ciphertext,
            c.contests[0].selections[0].ciphertext
        );
    }

    #[test]
    fn chain_is_order_independent() {
        let s = setup(1, 2);
        let encrypter = BallotEncrypter::new(&s.fp, &s.election, &s.context, &s.seed, 0);

        let b1 = encrypter.encrypt(&ballot("b0000001", &[1, 0])).unwrap();
        let b2 = encrypter.encrypt(&ballot("b0000002", &[0, 1])).unwrap();
        let b3 = encrypter.encrypt(&ballot("b0000003", &[0, 0])).unwrap();

        let mut forward = vec![b1.clone(), b2.clone(), b3.clone()];
        let mut shuffled = vec![b3, b1, b2];
        chain_ballots(&mut forward, &s.context.base_hash);
        chain_ballots(&mut shuffled, &s.context.base_hash);

        assert_eq!(forward, shuffled);
        verify_chain(&forward, &s.context.base_hash).unwrap();

        // Tampering with one timestamp breaks the chain.
        forward[1].timestamp = 7;
        let err = verify_chain(&forward, &s.context.base_hash).err().unwrap();
        assert_eq!(err.kind(), crate::errors::ErrorKind::CryptoInvariant);
    }
}
