// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The verifier: a pure consumer of a sealed directory and the published
//! public key.
//!
//! Four checks, all of which must pass for the tally to be valid:
//!
//! 1. every file referenced by `MANIFEST.json` re-hashes to its recorded
//!    SHA-256 and length;
//! 2. every ballot's selection proofs, contest-limit proofs, and the
//!    tracking-hash chain (gated by `recheck_ballots_and_tallies`);
//! 3. the homomorphic reduction re-run matches the stored aggregates;
//! 4. every aggregate's decryption proof verifies and decodes to its
//!    published count.
//!
//! Plus the advisory duplicate-hash heuristic, which only warns.

use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    manifest::Manifest,
    publish::{LoadOptions, TallyResults, load_tally},
    tally::{DEFAULT_SHARD_SIZE, tally_ballots},
};

/// Verification options.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Report per-ballot progress.
    pub verbose: bool,

    /// Re-check every ballot's proofs and the tracking chain. Without this
    /// only the tally-level artifacts are re-verified, which is much cheaper
    /// on large elections.
    pub recheck_ballots_and_tallies: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        VerifyOptions {
            verbose: false,
            recheck_ballots_and_tallies: true,
        }
    }
}

/// Re-checks the cryptographic claims of an in-memory [`TallyResults`]:
/// steps 2-4 above. `recheck_ballots_and_tallies` gates step 2.
pub fn all_proofs_valid(
    fixed_parameters: &FixedParameters,
    results: &TallyResults,
    verbose: bool,
    recheck_ballots_and_tallies: bool,
) -> VetResult<()> {
    let group = &fixed_parameters.group;
    let context = &results.context;

    if recheck_ballots_and_tallies {
        results
            .encrypted_ballots
            .par_iter()
            .try_for_each(|ballot| {
                if verbose {
                    info!("verifying ballot {}", ballot.object_id);
                }
                ballot.verify_proofs(fixed_parameters, context, &results.election)
            })?;

        crate::encrypt::verify_chain(&results.encrypted_ballots, &context.base_hash)?;
    }

    // Step 3: the aggregates stored with the tally must equal the product of
    // the stored ballots, and cover exactly the same key set.
    let recomputed = tally_ballots(&results.encrypted_ballots, group, DEFAULT_SHARD_SIZE);
    if recomputed.len() != results.tally.selections.len() {
        return Err(VetError::TallyKeySetMismatch);
    }
    for (key, aggregate) in &recomputed {
        let Some(stored) = results.tally.selections.get(key) else {
            return Err(VetError::TallyKeySetMismatch);
        };
        if stored.ciphertext != *aggregate {
            return Err(VetError::AggregateMismatch { key: key.clone() });
        }
    }

    // Step 4: decryption proofs, and the published counts decode from the
    // aggregates: g^count * M == beta.
    results
        .tally
        .selections
        .par_iter()
        .try_for_each(|(key, sel)| {
            if !sel.proof.verify(
                fixed_parameters,
                &context.base_hash,
                &context.public_key,
                &sel.ciphertext,
                &sel.share,
            ) {
                return Err(VetError::DecryptionProofInvalid { key: key.clone() });
            }

            let g_to_count =
                group.g_exp(&util::algebra::FieldElement::from(sel.count, &fixed_parameters.field));
            if g_to_count.mul(&sel.share, group) != sel.ciphertext.beta {
                return Err(VetError::DecryptedCountMismatch {
                    key: key.clone(),
                    published: sel.count,
                });
            }
            Ok(())
        })?;

    Ok(())
}

/// Full verification of a sealed directory: loads it (which re-hashes every
/// file against `MANIFEST.json` and compares `constants.json` to the compiled
/// parameters) and re-checks all proofs.
pub fn verify_tally_dir(
    fixed_parameters: &FixedParameters,
    root: &Path,
    options: &VerifyOptions,
) -> VetResult<()> {
    // Step 1: every referenced file re-hashes correctly. Reads through the
    // manifest verify on the way in, so one pass over the entries covers the
    // whole tree, including files load_tally would not otherwise touch.
    let manifest = Manifest::existing(root)?;
    let names: Vec<String> = manifest.entries().map(|(name, _)| name.clone()).collect();
    names.par_iter().try_for_each(|name| {
        if options.verbose {
            info!("re-hashing {name}");
        }
        manifest.read_manifest_name(name).map(|_| ())
    })?;

    if !manifest.all_hashes_unique() {
        // Duplicate ciphertext ballots are possible but suggest a problem;
        // see Manifest::all_hashes_unique for why this stays advisory.
        warn!("duplicate file hashes in {}", root.display());
    }

    let load_options = LoadOptions {
        check_proofs: true,
        recheck_ballots_and_tallies: options.recheck_ballots_and_tallies,
        verbose: options.verbose,
    };
    load_tally(fixed_parameters, root, &load_options)?;

    info!("tally under {} verifies", root.display());
    Ok(())
}
