// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

mod clargs;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;

use util::algebra::FieldElement;
use vet::{
    cvr::read_cvr_csv_path,
    el_gamal::ElGamalSecretKey,
    fixed_parameters::FixedParameters,
    hash::{HValue, vet_h},
    run::{TallyOptions, tally_everything},
    standard_parameters::STANDARD_PARAMETERS,
    verify::all_proofs_valid,
};

use crate::clargs::Clargs;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let clargs = Clargs::parse();

    let fixed_parameters: &FixedParameters = &STANDARD_PARAMETERS;

    // The key does not matter for benchmarking, so long as it is consistent
    // across runs. The library interface takes an externally provided key.
    let secret_key =
        ElGamalSecretKey::from_field_element(FieldElement::from(31337_u32, &fixed_parameters.field));

    for cvr_file in &clargs.cvr_file {
        let output_dir = clargs
            .dir
            .as_ref()
            .map(|dir| fresh_subdir(dir, cvr_file))
            .transpose()?;
        run_bench(
            fixed_parameters,
            &secret_key,
            cvr_file,
            output_dir.as_deref(),
            clargs.verbose,
        )?;
    }

    Ok(())
}

/// A fresh subdirectory of `dir` for one input file. Sealed trees are never
/// written over an existing one.
fn fresh_subdir(dir: &Path, cvr_file: &Path) -> Result<PathBuf> {
    let stem = cvr_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tally".to_owned());
    let subdir = dir.join(stem);
    ensure!(
        !subdir.exists(),
        "output directory {} already exists; pass a fresh directory per tally",
        subdir.display()
    );
    Ok(subdir)
}

fn run_bench(
    fixed_parameters: &FixedParameters,
    secret_key: &ElGamalSecretKey,
    cvr_file: &Path,
    output_dir: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    println!("Benchmarking: {}", cvr_file.display());

    let parse_start = Instant::now();
    let cvrs = read_cvr_csv_path(cvr_file)
        .with_context(|| format!("failed to read {}", cvr_file.display()))?;
    let parse_time = parse_start.elapsed().as_secs_f64();

    let cnt_ballots = cvrs.ballots.len();
    if cnt_ballots == 0 {
        bail!("can't have zero ballots!");
    }
    println!(
        "    Parse time: {parse_time:.3} sec, {:.3} ballots/sec",
        cnt_ballots as f64 / parse_time
    );

    let options = TallyOptions {
        master_seed: vet_h(&HValue::default(), b"vetally benchmark seed"),
        timestamp: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
        root_dir: output_dir.map(Path::to_path_buf),
        verbose,
        ..TallyOptions::default()
    };

    let tally_start = Instant::now();
    let results = tally_everything(fixed_parameters, &cvrs, secret_key, &options)
        .with_context(|| format!("tally failed for {}", cvr_file.display()))?;
    let tally_time = tally_start.elapsed().as_secs_f64();

    println!("\nOVERALL PERFORMANCE");
    println!("    Tally time:  {tally_time:.3} sec");
    println!(
        "    Tally rate:  {:.3} ballots/sec",
        cnt_ballots as f64 / tally_time
    );

    println!("\nSANITY CHECK");
    all_proofs_valid(fixed_parameters, &results, verbose, false)
        .context("proof failure!")?;
    println!("    proofs valid");

    if let Some(dir) = output_dir {
        println!("    sealed: {}", dir.display());
    }

    Ok(())
}
