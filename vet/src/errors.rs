// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The crate-wide error type.
//!
//! Every failure is classified by [`VetError::kind`] into one of five
//! [`ErrorKind`]s, which callers use for policy decisions (e.g. the verifier
//! reports any `StorageIntegrity` kind as "tally invalid"). Variants carry the
//! identity of the offending artifact: file, ballot id, contest.

/// Broad classification of a [`VetError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// CVR or audit-report parse failure, unknown columns, out-of-range
    /// selections.
    InputMalformed,

    /// Group element outside the subgroup, exponent out of range, proof
    /// verification failure.
    CryptoInvariant,

    /// Missing manifest entry, hash mismatch, length mismatch, conflicting
    /// merge.
    StorageIntegrity,

    /// Worker failure or cancellation.
    ParallelCoordination,

    /// Published `constants.json` disagrees with the compiled group
    /// parameters.
    ConfigMismatch,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InputMalformed => "InputMalformed",
            ErrorKind::CryptoInvariant => "CryptoInvariant",
            ErrorKind::StorageIntegrity => "StorageIntegrity",
            ErrorKind::ParallelCoordination => "ParallelCoordination",
            ErrorKind::ConfigMismatch => "ConfigMismatch",
        };
        f.write_str(s)
    }
}

/// The main [`std::error::Error`] type returned by functions of this crate.
#[derive(thiserror::Error, Debug)]
pub enum VetError {
    //--- InputMalformed

    #[error("CVR parse: {0}")]
    CvrParse(String),

    #[error("audit report parse: {0}")]
    AuditReportParse(String),

    #[error(
        "ballot `{ballot_id}` contest `{contest}` option `{option}`: selection value {value} is not 0 or 1"
    )]
    SelectionValueOutOfRange {
        ballot_id: String,
        contest: String,
        option: String,
        value: u64,
    },

    #[error(
        "ballot `{ballot_id}` contest `{contest}`: {sum} selections exceed the vote-for limit of {limit}"
    )]
    OvervotedContest {
        ballot_id: String,
        contest: String,
        sum: u64,
        limit: u32,
    },

    #[error("ballot `{ballot_id}` references contest `{contest}` which is not in the election description")]
    ContestNotInElection {
        ballot_id: String,
        contest: String,
    },

    #[error(
        "ballot `{ballot_id}` contest `{contest}`: selections do not match the contest's option list"
    )]
    SelectionsDontMatchContest {
        ballot_id: String,
        contest: String,
    },

    #[error("sampled ballot `{imprinted_id}` is not present in the tally")]
    SampledBallotUnknown { imprinted_id: String },

    //--- CryptoInvariant

    #[error(
        "ballot `{ballot_id}` contest `{contest}` option `{option}`: selection proof does not verify"
    )]
    SelectionProofInvalid {
        ballot_id: String,
        contest: String,
        option: String,
    },

    #[error("ballot `{ballot_id}` contest `{contest}`: selection-limit proof does not verify")]
    ContestLimitProofInvalid {
        ballot_id: String,
        contest: String,
    },

    #[error("ballot `{ballot_id}`: ciphertext component outside the subgroup")]
    CiphertextNotInGroup { ballot_id: String },

    #[error("ballot `{ballot_id}`: stored crypto hash does not match its contents")]
    BallotHashMismatch { ballot_id: String },

    #[error("ballot `{ballot_id}`: tracking hash does not extend the chain")]
    TrackingChainBroken { ballot_id: String },

    #[error("tally key `{key}`: aggregate ciphertext does not match the recomputed product")]
    AggregateMismatch { key: String },

    #[error("tally key `{key}`: decryption proof does not verify")]
    DecryptionProofInvalid { key: String },

    #[error("tally key `{key}`: published count {published} does not decode from the aggregate")]
    DecryptedCountMismatch { key: String, published: u64 },

    #[error("tally key `{key}`: no discrete log found within the ballot-count bound {bound}")]
    DiscreteLogNotFound { key: String, bound: u64 },

    #[error("tally key `{key}`: decryption share is not invertible")]
    ShareNotInvertible { key: String },

    #[error("tally keys on disk do not match the recomputed reduction (missing or extra keys)")]
    TallyKeySetMismatch,

    #[error("disjunctive proof requested for value {value} outside range 0..={limit}")]
    ProofValueOutOfRange { value: u64, limit: u64 },

    #[error(
        "ballot `{ballot_id}` contest `{contest}`: stored ciphertext does not decrypt under the derived nonce"
    )]
    AuditDecryptFailed {
        ballot_id: String,
        contest: String,
    },

    //--- StorageIntegrity

    #[error("no manifest entry for `{name}`")]
    ManifestEntryMissing { name: String },

    #[error("`{name}`: expected {expected} bytes, found {actual}")]
    FileLengthMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("`{name}`: content hash mismatch (expected {expected}, actual {actual})")]
    FileHashMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("cannot merge manifests rooted at `{left}` and `{right}`")]
    ManifestRootMismatch { left: String, right: String },

    #[error("cannot merge manifests: disagreeing contents for `{name}`")]
    ManifestMergeConflict { name: String },

    #[error("refusing to overwrite `{name}` with different content")]
    ManifestOverwriteConflict { name: String },

    #[error("manifest under `{root}` is sealed; no further writes are legal")]
    ManifestSealed { root: String },

    #[error("`MANIFEST.json` missing or malformed under `{root}`: {reason}")]
    ManifestUnreadable { root: String, reason: String },

    #[error("output directory `{root}` already contains files")]
    OutputDirNotEmpty { root: String },

    #[error("ballot `{ballot_id}` is not present in the published tree")]
    BallotNotFound { ballot_id: String },

    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on `{name}`: {reason}")]
    Json { name: String, reason: String },

    //--- ParallelCoordination

    #[error("run cancelled before completion")]
    Cancelled,

    //--- ConfigMismatch

    #[error("published constants.json does not match the compiled group parameters")]
    ConstantsMismatch,
}

impl VetError {
    /// The broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        use VetError::*;
        match self {
            CvrParse(_)
            | AuditReportParse(_)
            | SelectionValueOutOfRange { .. }
            | OvervotedContest { .. }
            | ContestNotInElection { .. }
            | SelectionsDontMatchContest { .. }
            | SampledBallotUnknown { .. } => ErrorKind::InputMalformed,

            SelectionProofInvalid { .. }
            | ContestLimitProofInvalid { .. }
            | CiphertextNotInGroup { .. }
            | BallotHashMismatch { .. }
            | TrackingChainBroken { .. }
            | AggregateMismatch { .. }
            | DecryptionProofInvalid { .. }
            | DecryptedCountMismatch { .. }
            | DiscreteLogNotFound { .. }
            | ShareNotInvertible { .. }
            | TallyKeySetMismatch
            | ProofValueOutOfRange { .. }
            | AuditDecryptFailed { .. } => ErrorKind::CryptoInvariant,

            ManifestEntryMissing { .. }
            | FileLengthMismatch { .. }
            | FileHashMismatch { .. }
            | ManifestRootMismatch { .. }
            | ManifestMergeConflict { .. }
            | ManifestOverwriteConflict { .. }
            | ManifestSealed { .. }
            | ManifestUnreadable { .. }
            | OutputDirNotEmpty { .. }
            | BallotNotFound { .. }
            | Io { .. }
            | Json { .. } => ErrorKind::StorageIntegrity,

            Cancelled => ErrorKind::ParallelCoordination,

            ConstantsMismatch => ErrorKind::ConfigMismatch,
        }
    }

    /// Wraps a `std::io::Error` with the path it occurred on.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        VetError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// [`Result`](std::result::Result) type with a [`VetError`].
pub type VetResult<T> = std::result::Result<T, VetError>;
