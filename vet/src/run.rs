// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The orchestrator: CVR export in, tally results (and optionally a sealed
//! directory) out.
//!
//! Fan-out, fan-in, decrypt: per-ballot encryption tasks run on the rayon
//! pool, the shard reducer folds their ciphertexts, the prover decrypts each
//! aggregate. Tasks communicate only through their inputs and outputs; the
//! single serial step is the tracking-hash chain, by design.
//!
//! Cancellation is cooperative. Workers consult the [`CancelToken`] between
//! ballots, never mid-proof (a partial proof is meaningless); on cancellation
//! the run returns [`VetError::Cancelled`] and nothing is sealed.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::info;

use crate::{
    cvr::CvrExport,
    context::ElectionContext,
    decrypt::decrypt_tally,
    el_gamal::ElGamalSecretKey,
    encrypt::{BallotEncrypter, chain_ballots},
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    hash::HValue,
    publish::{TallyResults, write_tally},
    tally::{DEFAULT_SHARD_SIZE, contest_ballot_counts, tally_ballots},
};

/// Cooperative cancellation flag shared between the coordinator and workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for [`tally_everything`].
#[derive(Debug, Clone)]
pub struct TallyOptions {
    /// Seed for all nonce derivation. Two runs with the same seed and inputs
    /// produce byte-identical artifacts.
    pub master_seed: HValue,

    /// Encryption timestamp recorded on every ballot. An input rather than
    /// wall-clock sampled, so runs are reproducible.
    pub timestamp: u64,

    /// Ballots per reduction shard.
    pub shard_size: usize,

    /// When set, publish the sealed directory tree here. The directory must
    /// be fresh; pass a new one per tally.
    pub root_dir: Option<PathBuf>,

    /// Wipe `root_dir` first if it exists.
    pub delete_existing: bool,

    /// Report per-ballot progress while verifying.
    pub verbose: bool,

    /// Cooperative cancellation flag.
    pub cancel: Option<CancelToken>,
}

impl Default for TallyOptions {
    fn default() -> Self {
        TallyOptions {
            master_seed: HValue::default(),
            timestamp: 0,
            shard_size: DEFAULT_SHARD_SIZE,
            root_dir: None,
            delete_existing: false,
            verbose: false,
            cancel: None,
        }
    }
}

/// Runs the whole pipeline over a parsed CVR export: encrypt every ballot,
/// reduce, decrypt with proofs, and (when `root_dir` is set) publish the
/// sealed directory.
///
/// The caller supplies the secret key; deriving one from a fixed seed is a
/// benchmarking affordance that lives in the CLI, not here.
pub fn tally_everything(
    fixed_parameters: &FixedParameters,
    cvrs: &CvrExport,
    secret_key: &ElGamalSecretKey,
    options: &TallyOptions,
) -> VetResult<TallyResults> {
    let public_key = secret_key.public_key(fixed_parameters);
    let context = ElectionContext::new(fixed_parameters, &cvrs.election, public_key)?;

    let encrypter = BallotEncrypter::new(
        fixed_parameters,
        &cvrs.election,
        &context,
        &options.master_seed,
        options.timestamp,
    );

    info!("tally_everything: encrypting {} ballots", cvrs.ballots.len());
    let mut encrypted_ballots = cvrs
        .ballots
        .par_iter()
        .map(|ballot| {
            if let Some(cancel) = &options.cancel {
                if cancel.is_cancelled() {
                    return Err(VetError::Cancelled);
                }
            }
            encrypter.encrypt(ballot)
        })
        .collect::<VetResult<Vec<_>>>()?;

    chain_ballots(&mut encrypted_ballots, &context.base_hash);

    info!("tally_everything: reducing");
    let tally_map = tally_ballots(&encrypted_ballots, &fixed_parameters.group, options.shard_size);

    if let Some(cancel) = &options.cancel {
        if cancel.is_cancelled() {
            return Err(VetError::Cancelled);
        }
    }

    // Each selection's discrete-log search is bounded by the number of
    // ballots containing its contest.
    let per_contest = contest_ballot_counts(&encrypted_ballots);
    let bounds = tally_map
        .keys()
        .map(|key| {
            let contest_id = key.split('-').next().unwrap_or(key.as_str());
            let bound = per_contest.get(contest_id).copied().unwrap_or(0);
            (key.clone(), bound)
        })
        .collect();

    info!("tally_everything: decrypting {} aggregates", tally_map.len());
    let tally = decrypt_tally(
        fixed_parameters,
        &context,
        secret_key,
        &tally_map,
        &bounds,
        &options.master_seed,
    )?;

    let results = TallyResults {
        metadata: cvrs.metadata.clone(),
        election: cvrs.election.clone(),
        context,
        encrypted_ballots,
        tally,
    };

    if let Some(root_dir) = &options.root_dir {
        write_tally(&results, fixed_parameters, root_dir, options.delete_existing)?;
    }

    Ok(results)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use crate::{cvr::read_cvr_csv, standard_parameters::toy_parameters_q64p256};
    use util::algebra::FieldElement;

    const CVR: &str = "\
Cancel Test Election
,,C1,C1
,,A,B
CvrNumber,ImprintedId,,
1,1-1-1,1,0
2,1-1-2,0,1
";

    #[test]
    fn cancellation_aborts_without_output() {
        let fp = toy_parameters_q64p256();
        let cvrs = read_cvr_csv(CVR.as_bytes()).unwrap();
        let secret = ElGamalSecretKey::from_field_element(FieldElement::from(31337_u32, &fp.field));

        let cancel = CancelToken::new();
        cancel.cancel();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        let options = TallyOptions {
            root_dir: Some(root.clone()),
            cancel: Some(cancel),
            ..TallyOptions::default()
        };

        let err = tally_everything(&fp, &cvrs, &secret, &options).err().unwrap();
        assert_eq!(err.kind(), crate::errors::ErrorKind::ParallelCoordination);
        assert!(!root.join("MANIFEST.json").exists());
    }
}
