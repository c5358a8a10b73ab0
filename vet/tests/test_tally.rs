// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![allow(clippy::unwrap_used)] // tests

//! End-to-end scenarios: CVR in, sealed verified directory out.

use std::path::Path;

use util::algebra::FieldElement;
use vet::{
    cvr::read_cvr_csv,
    el_gamal::ElGamalSecretKey,
    errors::ErrorKind,
    fixed_parameters::FixedParameters,
    hash::{HValue, vet_h},
    manifest::{MANIFEST_FILE, Manifest},
    publish::{
        CRYPTO_CONSTANTS, CRYPTO_CONTEXT, ELECTION_DESCRIPTION, ELECTION_METADATA,
        ENCRYPTED_TALLY, load_tally,
    },
    run::{TallyOptions, tally_everything},
    verify::{VerifyOptions, verify_tally_dir},
};

const THREE_BALLOT_CVR: &str = "\
Demo General Election,Demo County
,,C1,C1
,,A,B
CvrNumber,ImprintedId,,
1,1-1-1,1,0
2,1-1-2,1,0
3,1-1-3,0,1
";

fn toy() -> FixedParameters {
    vet::standard_parameters::toy_parameters_q64p256()
}

fn test_secret(fp: &FixedParameters) -> ElGamalSecretKey {
    ElGamalSecretKey::from_field_element(FieldElement::from(31337_u32, &fp.field))
}

fn test_options(root: Option<&Path>) -> TallyOptions {
    TallyOptions {
        master_seed: vet_h(&HValue::default(), b"integration test seed"),
        timestamp: 12345,
        root_dir: root.map(Path::to_path_buf),
        ..TallyOptions::default()
    }
}

/// Scenario 1: three ballots, one 1-of-2 contest, votes [A, A, B].
#[test]
fn three_ballots_tally_and_verify() {
    let fp = toy();
    let cvrs = read_cvr_csv(THREE_BALLOT_CVR.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tally");
    let results =
        tally_everything(&fp, &cvrs, &secret, &test_options(Some(&root))).unwrap();

    assert_eq!(results.tally.selections["c0001-o0001"].count, 2);
    assert_eq!(results.tally.selections["c0001-o0002"].count, 1);

    verify_tally_dir(&fp, &root, &VerifyOptions::default()).unwrap();

    // The loaded results round-trip exactly.
    let loaded = load_tally(&fp, &root, &Default::default()).unwrap();
    assert_eq!(loaded.tally, results.tally);
    assert_eq!(loaded.context, results.context);
    assert_eq!(loaded.encrypted_ballots, results.encrypted_ballots);
    assert_eq!(loaded.metadata, results.metadata);

    // Single ballots load (verified) by id from the sealed tree.
    let manifest = Manifest::existing(&root).unwrap();
    let ballot = manifest.load_ciphertext_ballot("b0000002").unwrap();
    assert_eq!(ballot, results.encrypted_ballots[1]);
    let err = manifest.load_ciphertext_ballot("b9999999").err().unwrap();
    assert!(matches!(err, vet::errors::VetError::BallotNotFound { .. }));
}

/// Scenario 2: one ballot in a 2-of-3 contest with votes [1, 1, 0]; the
/// selection-limit proof for sum 2 <= k = 2 verifies.
#[test]
fn two_of_three_contest_verifies() {
    let fp = toy();
    let cvr = "\
Vote For Two Election
,,C1 (Vote For=2),C1 (Vote For=2),C1 (Vote For=2)
,,X,Y,Z
CvrNumber,ImprintedId,,,
1,2-1-1,1,1,0
";
    let cvrs = read_cvr_csv(cvr.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    let results = tally_everything(&fp, &cvrs, &secret, &test_options(None)).unwrap();

    let counts: Vec<u64> = ["c0001-o0001", "c0001-o0002", "c0001-o0003"]
        .iter()
        .map(|key| results.tally.selections[*key].count)
        .collect();
    assert_eq!(counts, vec![1, 1, 0]);

    vet::verify::all_proofs_valid(&fp, &results, false, true).unwrap();
}

/// Scenario 3: an overvoted 1-of-N contest is rejected before encryption.
#[test]
fn overvote_is_input_malformed() {
    let fp = toy();
    let cvr = "\
Overvote Election
,,C1,C1,C1
,,X,Y,Z
CvrNumber,ImprintedId,,,
1,3-1-1,1,1,0
";
    let cvrs = read_cvr_csv(cvr.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    let err = tally_everything(&fp, &cvrs, &secret, &test_options(None))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InputMalformed);
}

/// Scenario 4: flipping one bit of any stored ballot file fails verification
/// with a storage-integrity error.
#[test]
fn bit_flip_in_ballot_file_detected() {
    let fp = toy();
    let cvrs = read_cvr_csv(THREE_BALLOT_CVR.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tally");
    tally_everything(&fp, &cvrs, &secret, &test_options(Some(&root))).unwrap();

    let ballot_path = root
        .join("ballots")
        .join("b000")
        .join("b0000002.json");
    let mut bytes = std::fs::read(&ballot_path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    std::fs::write(&ballot_path, &bytes).unwrap();

    let err = verify_tally_dir(&fp, &root, &VerifyOptions::default())
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::StorageIntegrity);
}

/// Scenario 5: deleting a file's entry from MANIFEST.json fails verification
/// with a missing-entry error.
#[test]
fn missing_manifest_entry_detected() {
    let fp = toy();
    let cvrs = read_cvr_csv(THREE_BALLOT_CVR.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tally");
    tally_everything(&fp, &cvrs, &secret, &test_options(Some(&root))).unwrap();

    let manifest_path = root.join(MANIFEST_FILE);
    let mut manifest_json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
    let hashes = manifest_json["hashes"].as_object_mut().unwrap();
    hashes.remove("ballots|b000|b0000001.json").unwrap();
    std::fs::write(&manifest_path, serde_json::to_vec(&manifest_json).unwrap()).unwrap();

    let err = verify_tally_dir(&fp, &root, &VerifyOptions::default())
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::StorageIntegrity);
    assert!(matches!(
        err,
        vet::errors::VetError::ManifestEntryMissing { .. }
    ));
}

/// Scenario 6: two workers each encrypting and writing half of the ballots
/// through private partial manifests, merged and sealed by the coordinator,
/// produce a byte-identical MANIFEST.json to the single-worker run.
#[test]
fn two_worker_merge_equals_single_run() {
    let fp = toy();
    let cvr = {
        let mut s = String::from(
            "Merge Election\n,,C1,C1\n,,A,B\nCvrNumber,ImprintedId,,\n",
        );
        for i in 1..=10 {
            s.push_str(&format!("{i},6-1-{i},{},{}\n", i % 2, 1 - i % 2));
        }
        s
    };
    let cvrs = read_cvr_csv(cvr.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    // Single-worker reference run.
    let dir = tempfile::tempdir().unwrap();
    let single_root = dir.path().join("single");
    let results =
        tally_everything(&fp, &cvrs, &secret, &test_options(Some(&single_root))).unwrap();

    // "Two worker" run: same results, but the ballots written through two
    // private partial manifests that the coordinator merges before sealing.
    let merged_root = dir.path().join("merged");
    let mut coordinator = Manifest::fresh(&merged_root, false).unwrap();
    coordinator
        .write_json_file(&[ELECTION_DESCRIPTION], &results.election)
        .unwrap();
    coordinator
        .write_json_file(&[CRYPTO_CONTEXT], &results.context)
        .unwrap();
    coordinator.write_json_file(&[CRYPTO_CONSTANTS], &fp).unwrap();
    coordinator
        .write_json_file(&[ENCRYPTED_TALLY], &results.tally)
        .unwrap();
    coordinator
        .write_json_file(&[ELECTION_METADATA], &results.metadata)
        .unwrap();

    let (first_half, second_half) = results.encrypted_ballots.split_at(5);
    let mut worker_a = Manifest::fresh(&merged_root, false).unwrap();
    for ballot in first_half {
        worker_a.write_ciphertext_ballot(ballot).unwrap();
    }
    let mut worker_b = Manifest::fresh(&merged_root, false).unwrap();
    for ballot in second_half {
        worker_b.write_ciphertext_ballot(ballot).unwrap();
    }

    coordinator.merge_from(worker_b).unwrap();
    coordinator.merge_from(worker_a).unwrap();
    coordinator.seal().unwrap();

    let single_manifest = std::fs::read(single_root.join(MANIFEST_FILE)).unwrap();
    let merged_manifest = std::fs::read(merged_root.join(MANIFEST_FILE)).unwrap();
    assert_eq!(single_manifest, merged_manifest);

    verify_tally_dir(&fp, &merged_root, &VerifyOptions::default()).unwrap();
}

/// Property 7: the same CVR and seed produce byte-identical sealed
/// directories.
#[test]
fn determinism_under_seed() {
    let fp = toy();
    let cvrs = read_cvr_csv(THREE_BALLOT_CVR.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    let dir = tempfile::tempdir().unwrap();
    let root_a = dir.path().join("a");
    let root_b = dir.path().join("b");
    tally_everything(&fp, &cvrs, &secret, &test_options(Some(&root_a))).unwrap();
    tally_everything(&fp, &cvrs, &secret, &test_options(Some(&root_b))).unwrap();

    let manifest_a = Manifest::existing(&root_a).unwrap();
    assert_eq!(
        std::fs::read(root_a.join(MANIFEST_FILE)).unwrap(),
        std::fs::read(root_b.join(MANIFEST_FILE)).unwrap()
    );
    for (name, _) in manifest_a.entries() {
        assert_eq!(
            manifest_a.read_manifest_name(name).unwrap(),
            Manifest::existing(&root_b)
                .unwrap()
                .read_manifest_name(name)
                .unwrap(),
            "{name} differs between runs"
        );
    }
}

/// Loading under different compiled parameters is a config mismatch.
#[test]
fn constants_mismatch_refused() {
    let fp = toy();
    let cvrs = read_cvr_csv(THREE_BALLOT_CVR.as_bytes()).unwrap();
    let secret = test_secret(&fp);

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("tally");
    tally_everything(&fp, &cvrs, &secret, &test_options(Some(&root))).unwrap();

    let other = &vet::standard_parameters::STANDARD_PARAMETERS;
    let err = load_tally(other, &root, &Default::default()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ConfigMismatch);
}

/// Audit reconciliation: matching CVR results reconcile cleanly, a
/// discrepant row is reported, and non-AUDITED rows are skipped.
#[test]
fn audit_reconciliation() {
    let fp = toy();
    let cvrs = read_cvr_csv(THREE_BALLOT_CVR.as_bytes()).unwrap();
    let secret = test_secret(&fp);
    let options = test_options(None);

    let results = tally_everything(&fp, &cvrs, &secret, &options).unwrap();

    let report = "\
######## ELECTION INFO ########
Election Name
Demo General Election

######## SAMPLED BALLOTS ########
Imprinted ID,Audited?,Audit Result: C1 Vote for 1,CVR Result: C1 Vote for 1,Discrepancy: C1 Vote for 1
1-1-1,AUDITED,A,A,
1-1-3,AUDITED,B,B,
1-1-2,NOT_AUDITED,B,B,
";
    let sampled = vet::audit::parse_audit_report(report).unwrap();
    let mismatches =
        vet::audit::reconcile_audit(&fp, &results, &options.master_seed, &sampled).unwrap();
    assert_eq!(mismatches, Vec::new());

    // A report claiming ballot 1 chose B must be flagged.
    let lying_report = report.replace("1-1-1,AUDITED,A,A,", "1-1-1,AUDITED,B,B,");
    let sampled = vet::audit::parse_audit_report(&lying_report).unwrap();
    let mismatches =
        vet::audit::reconcile_audit(&fp, &results, &options.master_seed, &sampled).unwrap();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].imprinted_id, "1-1-1");
    assert_eq!(mismatches[0].contest, "C1");
    assert_eq!(mismatches[0].expected.as_deref(), Some("B"));
    assert_eq!(mismatches[0].decrypted.as_deref(), Some("A"));
}
