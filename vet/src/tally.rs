// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The homomorphic reducer: per-(contest, selection) products of ballot
//! ciphertexts.
//!
//! A two-level tree reduction: ballots partition into shards, each shard
//! accumulates into a partial map keyed by selection object id, and partials
//! merge pairwise until one remains. The group operation is associative and
//! commutative, so any reduction order yields the same result; every
//! accumulation is seeded with the identity ciphertext `(1, 1)` so that
//! one-element and zero-element shards reduce correctly. The coordinator only
//! ever holds partial maps, never all ciphertexts at once.

use std::collections::BTreeMap;

use rayon::prelude::*;
use util::algebra::Group;

use crate::{ballot::CiphertextBallot, ciphertext::Ciphertext};

/// Default number of ballots per reduction shard.
pub const DEFAULT_SHARD_SIZE: usize = 32;

/// Partial or final aggregate: selection object id to the running product.
pub type TallyMap = BTreeMap<String, Ciphertext>;

/// Reduces one shard of ballots into a partial aggregate.
pub fn accumulate_shard(ballots: &[CiphertextBallot], group: &Group) -> TallyMap {
    let mut map = TallyMap::new();
    for ballot in ballots {
        for contest in &ballot.contests {
            for selection in &contest.selections {
                let acc = map
                    .entry(selection.object_id.clone())
                    .or_insert_with(Ciphertext::one);
                *acc = acc.mul(&selection.ciphertext, group);
            }
        }
    }
    map
}

/// Merges two partial aggregates.
pub fn combine(mut left: TallyMap, right: TallyMap, group: &Group) -> TallyMap {
    for (key, ct) in right {
        let acc = left.entry(key).or_insert_with(Ciphertext::one);
        *acc = acc.mul(&ct, group);
    }
    left
}

/// The full tree reduction over all ballots, shards in parallel.
pub fn tally_ballots(
    ballots: &[CiphertextBallot],
    group: &Group,
    shard_size: usize,
) -> TallyMap {
    let shard_size = shard_size.max(1);

    ballots
        .par_chunks(shard_size)
        .map(|shard| accumulate_shard(shard, group))
        .reduce(TallyMap::new, |a, b| combine(a, b, group))
}

/// The number of ballots containing each contest, keyed by contest object id.
/// Bounds the discrete-log search during decryption.
pub fn contest_ballot_counts(ballots: &[CiphertextBallot]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for ballot in ballots {
        for contest in &ballot.contests {
            *counts.entry(contest.object_id.clone()).or_insert(0u64) += 1;
        }
    }
    counts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use util::csprng::Csprng;

    use super::*;
    use crate::{
        ballot::{PlaintextBallot, PlaintextContest, PlaintextSelection},
        context::ElectionContext,
        el_gamal::ElGamalSecretKey,
        election_manifest::{Contest, ContestOption, ElectionManifest},
        encrypt::BallotEncrypter,
        hash::{HValue, vet_h},
        standard_parameters::toy_parameters_q64p256,
    };

    #[test]
    fn reduction_is_shard_size_independent() {
        let fp = toy_parameters_q64p256();
        let election = ElectionManifest {
            title: "Tally Test".to_owned(),
            jurisdiction: None,
            contests: vec![Contest {
                object_id: "c0001".to_owned(),
                label: "C1".to_owned(),
                selection_limit: 1,
                options: vec![
                    ContestOption {
                        object_id: "c0001-o0001".to_owned(),
                        label: "A".to_owned(),
                        is_write_in: false,
                    },
                    ContestOption {
                        object_id: "c0001-o0002".to_owned(),
                        label: "B".to_owned(),
                        is_write_in: false,
                    },
                ],
            }],
        };

        let mut csprng = Csprng::new(b"tally test keys");
        let secret = ElGamalSecretKey::generate(&mut csprng, &fp);
        let context = ElectionContext::new(&fp, &election, secret.public_key(&fp)).unwrap();
        let seed = vet_h(&HValue::default(), b"tally test seed");
        let encrypter = BallotEncrypter::new(&fp, &election, &context, &seed, 0);

        // votes: A, A, B, A, B
        let votes = [[1u64, 0], [1, 0], [0, 1], [1, 0], [0, 1]];
        let ballots: Vec<_> = votes
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let pb = PlaintextBallot {
                    object_id: format!("b{:07}", i + 1),
                    imprinted_id: None,
                    contests: vec![PlaintextContest {
                        object_id: "c0001".to_owned(),
                        selections: v
                            .iter()
                            .enumerate()
                            .map(|(j, &vote)| PlaintextSelection {
                                object_id: format!("c0001-o{:04}", j + 1),
                                vote,
                                write_in: None,
                            })
                            .collect(),
                    }],
                };
                encrypter.encrypt(&pb).unwrap()
            })
            .collect();

        let tally_1 = tally_ballots(&ballots, &fp.group, 1);
        let tally_2 = tally_ballots(&ballots, &fp.group, 2);
        let tally_big = tally_ballots(&ballots, &fp.group, 1000);
        assert_eq!(tally_1, tally_2);
        assert_eq!(tally_1, tally_big);

        // Aggregates equal the straight product of all per-ballot ciphertexts.
        let serial = accumulate_shard(&ballots, &fp.group);
        assert_eq!(tally_1, serial);

        assert_eq!(contest_ballot_counts(&ballots).get("c0001"), Some(&5));
    }
}
