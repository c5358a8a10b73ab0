// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

use std::path::PathBuf;

/// Runs a verifiable tallying benchmark over one or more CVR exports.
#[derive(Debug, clap::Parser)]
pub(crate) struct Clargs {
    /// Directory to store the sealed tally trees (one fresh subdirectory per
    /// input file); enables full on-disk verification. Default: memory only.
    #[arg(long, env = "VETALLY_DIR")]
    pub dir: Option<PathBuf>,

    /// Report per-ballot progress during verification.
    #[arg(long)]
    pub verbose: bool,

    /// Filename(s) of the tabular ballot CVR export(s).
    #[arg(required = true)]
    pub cvr_file: Vec<PathBuf>,
}
