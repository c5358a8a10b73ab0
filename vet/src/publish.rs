// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Writing a tally to a sealed directory tree, and loading one back.
//!
//! On-disk layout under the caller's root:
//!
//! ```text
//! <root>/
//!   MANIFEST.json
//!   election_description.json
//!   cryptographic_context.json
//!   constants.json
//!   encrypted_tally.json
//!   election_metadata.json
//!   ballots/<first-4-chars-of-id>/<id>.json
//! ```
//!
//! `constants.json` carries the group parameters the tally was produced
//! under; loading refuses a directory whose constants disagree with the
//! compiled-in parameters.

use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    ballot::CiphertextBallot,
    context::ElectionContext,
    decrypt::SelectionTally,
    election_manifest::ElectionManifest,
    election_metadata::ElectionMetadata,
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    manifest::{BALLOTS_DIR, Manifest, compose_manifest_name},
};

pub const ELECTION_DESCRIPTION: &str = "election_description.json";
pub const CRYPTO_CONTEXT: &str = "cryptographic_context.json";
pub const CRYPTO_CONSTANTS: &str = "constants.json";
pub const ENCRYPTED_TALLY: &str = "encrypted_tally.json";
pub const ELECTION_METADATA: &str = "election_metadata.json";

/// Number of ballots each parallel writer owns, along with its private
/// partial manifest.
const WRITE_CHUNK_SIZE: usize = 64;

/// Everything a finished tally run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TallyResults {
    pub metadata: ElectionMetadata,
    pub election: ElectionManifest,
    pub context: ElectionContext,
    pub encrypted_ballots: Vec<CiphertextBallot>,
    pub tally: SelectionTally,
}

/// Writes the full contents of a tally as a sealed directory. Each ciphertext
/// ballot lands in its own file; everything is JSON.
///
/// Ballot writes run in parallel: each chunk of ballots writes through its
/// own partial [`Manifest`] (disjoint paths, no lock), and the coordinator
/// merges the partials before sealing. A non-empty target directory is
/// refused unless `delete_existing`; a tally is always published into a fresh
/// root.
pub fn write_tally(
    results: &TallyResults,
    fixed_parameters: &FixedParameters,
    root: &Path,
    delete_existing: bool,
) -> VetResult<()> {
    if !delete_existing
        && root.exists()
        && root
            .read_dir()
            .map_err(|e| VetError::io(root, e))?
            .next()
            .is_some()
    {
        return Err(VetError::OutputDirNotEmpty {
            root: root.display().to_string(),
        });
    }

    info!("write_tally: starting under {}", root.display());
    let mut manifest = Manifest::fresh(root, delete_existing)?;

    manifest.write_json_file(&[ELECTION_DESCRIPTION], &results.election)?;
    manifest.write_json_file(&[CRYPTO_CONTEXT], &results.context)?;
    manifest.write_json_file(&[CRYPTO_CONSTANTS], fixed_parameters)?;
    manifest.write_json_file(&[ENCRYPTED_TALLY], &results.tally)?;
    manifest.write_json_file(&[ELECTION_METADATA], &results.metadata)?;

    info!(
        "write_tally: writing {} ballots",
        results.encrypted_ballots.len()
    );
    let partials = results
        .encrypted_ballots
        .par_chunks(WRITE_CHUNK_SIZE)
        .map(|chunk| {
            let mut partial = Manifest::fresh(root, false)?;
            for ballot in chunk {
                partial.write_ciphertext_ballot(ballot)?;
            }
            Ok(partial)
        })
        .collect::<VetResult<Vec<_>>>()?;

    for partial in partials {
        manifest.merge_from(partial)?;
    }

    if !manifest.all_hashes_unique() {
        // Advisory only; see Manifest::all_hashes_unique.
        warn!("write_tally: duplicate file hashes present in the sealed tree");
    }

    manifest.seal()?;
    info!("write_tally: sealed");
    Ok(())
}

/// Options for [`load_tally`].
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Re-verify all proofs after loading.
    pub check_proofs: bool,

    /// With `check_proofs`: also re-check every ballot's proofs and the
    /// tracking chain, not only the tally-level artifacts.
    pub recheck_ballots_and_tallies: bool,

    /// Report per-ballot progress.
    pub verbose: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            check_proofs: true,
            recheck_ballots_and_tallies: true,
            verbose: false,
        }
    }
}

/// Reads a sealed tally directory back into memory, verifying every file
/// against the manifest as it is read, and refusing mismatched constants.
///
/// With `check_proofs` the cryptographic artifacts are re-verified too (see
/// [`crate::verify`]).
pub fn load_tally(
    fixed_parameters: &FixedParameters,
    root: &Path,
    options: &LoadOptions,
) -> VetResult<TallyResults> {
    let manifest = Manifest::existing(root)?;

    let election: ElectionManifest = manifest.read_json_file(&[ELECTION_DESCRIPTION])?;
    let context: ElectionContext = manifest.read_json_file(&[CRYPTO_CONTEXT])?;
    let constants: FixedParameters = manifest.read_json_file(&[CRYPTO_CONSTANTS])?;
    let tally: SelectionTally = manifest.read_json_file(&[ENCRYPTED_TALLY])?;
    let metadata: ElectionMetadata = manifest.read_json_file(&[ELECTION_METADATA])?;

    if constants != *fixed_parameters {
        return Err(VetError::ConstantsMismatch);
    }

    // Every ballot file on disk must be covered by a manifest entry; a file
    // the manifest does not know is as suspect as a missing one.
    let ballots_dir = root.join(BALLOTS_DIR);
    if ballots_dir.exists() {
        for shard in std::fs::read_dir(&ballots_dir).map_err(|e| VetError::io(&ballots_dir, e))? {
            let shard = shard.map_err(|e| VetError::io(&ballots_dir, e))?;
            let shard_name = shard.file_name().to_string_lossy().into_owned();
            for file in
                std::fs::read_dir(shard.path()).map_err(|e| VetError::io(&shard.path(), e))?
            {
                let file = file.map_err(|e| VetError::io(&shard.path(), e))?;
                let file_name = file.file_name().to_string_lossy().into_owned();
                let name = compose_manifest_name(&[BALLOTS_DIR, &shard_name, &file_name]);
                if !manifest.contains(&name) {
                    return Err(VetError::ManifestEntryMissing { name });
                }
            }
        }
    }

    let ballot_names: Vec<String> = manifest
        .entries()
        .map(|(name, _)| name.clone())
        .filter(|name| name.starts_with(BALLOTS_DIR) && name.as_bytes().get(BALLOTS_DIR.len()) == Some(&b'|'))
        .collect();

    let mut encrypted_ballots = ballot_names
        .par_iter()
        .map(|name| {
            if options.verbose {
                info!("load_tally: reading {name}");
            }
            let bytes = manifest.read_manifest_name(name)?;
            serde_json::from_slice::<CiphertextBallot>(&bytes).map_err(|e| VetError::Json {
                name: name.clone(),
                reason: e.to_string(),
            })
        })
        .collect::<VetResult<Vec<_>>>()?;
    encrypted_ballots.sort_by(|a, b| a.object_id.cmp(&b.object_id));

    let results = TallyResults {
        metadata,
        election,
        context,
        encrypted_ballots,
        tally,
    };

    if options.check_proofs {
        crate::verify::all_proofs_valid(
            fixed_parameters,
            &results,
            options.verbose,
            options.recheck_ballots_and_tallies,
        )?;
    }

    Ok(results)
}
