// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! End-to-end verifiable homomorphic tallying of cast-vote records.
//!
//! The pipeline: a CVR export ([`cvr`]) becomes per-ballot ElGamal
//! ciphertexts with zero-knowledge proofs ([`encrypt`]), which reduce to one
//! aggregate ciphertext per contest selection ([`tally`]), which decrypt with
//! proofs of correct decryption ([`decrypt`]). Every artifact is sealed under
//! a content-addressed manifest ([`manifest`], [`publish`]) that a verifier
//! ([`verify`]) re-checks from the directory and the public key alone.
//! [`audit`] reconciles externally sampled paper ballots against the sealed
//! encrypted corpus. [`run`] ties the stages together.

pub mod audit;
pub mod ballot;
pub mod ciphertext;
pub mod context;
pub mod cvr;
pub mod decrypt;
pub mod el_gamal;
pub mod election_manifest;
pub mod election_metadata;
pub mod encrypt;
pub mod errors;
pub mod fixed_parameters;
pub mod hash;
pub mod manifest;
pub mod publish;
pub mod run;
pub mod standard_parameters;
pub mod tally;
pub mod verify;
pub mod zk;
