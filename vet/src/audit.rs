// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Audit-report parsing and reconciliation of sampled paper ballots against
//! the encrypted corpus.
//!
//! An audit report is a concatenation of CSV sections delimited by lines of
//! the form `######## <NAME> ########`; only `SAMPLED BALLOTS` is consumed.
//! Within it, `Imprinted ID` connects a row to a stored ciphertext ballot,
//! `Audited?` must be the literal `AUDITED` for the row to count, and the
//! per-contest columns are `Audit Result: <name>`, `CVR Result: <name>`, and
//! `Discrepancy: <name>` (any ` Vote for ...` suffix is stripped from the
//! name). `CONTEST_NOT_ON_BALLOT` and empty cells normalize to none.
//!
//! The cryptographic decision uses the `CVR Result` columns only: the
//! reconciler re-derives each selection's encryption nonce from the master
//! seed, decrypts the stored ciphertexts, and compares. `Audit Result` and
//! `Discrepancy` are carried for reporting but never consulted.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::info;

use crate::{
    encrypt::BallotEncrypter,
    errors::{VetError, VetResult},
    fixed_parameters::FixedParameters,
    hash::HValue,
    publish::TallyResults,
};

const SECTION_DELIMITER: &str = "########";
const SAMPLED_BALLOTS_SECTION: &str = "######## SAMPLED BALLOTS ########";

const IMPRINTED_ID: &str = "Imprinted ID";
const AUDITED: &str = "Audited?";
const CVR_RESULT_PREFIX: &str = "CVR Result: ";
const AUDIT_RESULT_PREFIX: &str = "Audit Result: ";
const DISCREPANCY_PREFIX: &str = "Discrepancy: ";

/// One row of the `SAMPLED BALLOTS` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledBallot {
    /// The unique id imprinted on the paper ballot.
    pub imprinted_id: String,

    /// True iff the `Audited?` column was exactly `AUDITED`.
    pub audited: bool,

    /// Contest name to the auditors' reading of the paper ballot.
    pub audit_result: BTreeMap<String, Option<String>>,

    /// Contest name to the CVR's recorded result. The column that matters.
    pub cvr_result: BTreeMap<String, Option<String>>,

    /// Contest name to any discrepancy the audit platform recorded.
    pub discrepancy: BTreeMap<String, Option<String>>,
}

/// Strips the column prefix and any ` Vote for ...` suffix from a contest
/// column name.
fn fix_contest_name(column: &str, prefix: &str) -> String {
    let name = &column[prefix.len()..];
    let name = match name.find(" Vote for") {
        Some(pos) => &name[..pos],
        None => name,
    };
    name.trim().to_owned()
}

/// Empty cells and `CONTEST_NOT_ON_BALLOT` normalize to none.
fn fix_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "CONTEST_NOT_ON_BALLOT" {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Extracts the `SAMPLED BALLOTS` rows from a full audit report.
///
/// The section header as the very last line yields an empty list; a report
/// with no such section at all is an error.
pub fn parse_audit_report(text: &str) -> VetResult<Vec<SampledBallot>> {
    let lines: Vec<&str> = text.lines().collect();

    let Some(header_line_no) = lines
        .iter()
        .position(|line| line.starts_with(SAMPLED_BALLOTS_SECTION))
    else {
        return Err(VetError::AuditReportParse(
            "no SAMPLED BALLOTS section".to_owned(),
        ));
    };

    let section: Vec<&str> = lines[header_line_no + 1..]
        .iter()
        .take_while(|line| !line.starts_with(SECTION_DELIMITER))
        .copied()
        .collect();
    if section.is_empty() {
        return Ok(Vec::new());
    }

    let section_text = section.join("\n");
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(section_text.as_bytes());

    let headers = csv_reader
        .headers()
        .map_err(|e| VetError::AuditReportParse(e.to_string()))?
        .clone();

    let Some(imprinted_col) = headers.iter().position(|h| h.trim() == IMPRINTED_ID) else {
        return Err(VetError::AuditReportParse(format!(
            "no `{IMPRINTED_ID}` column; fields = [{}]",
            headers.iter().join(",")
        )));
    };
    let audited_col = headers.iter().position(|h| h.trim() == AUDITED);

    let mut sampled = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| VetError::AuditReportParse(e.to_string()))?;

        let imprinted_id = record.get(imprinted_col).unwrap_or_default().trim();
        if imprinted_id.is_empty() {
            continue;
        }

        let audited = audited_col
            .and_then(|col| record.get(col))
            .map(|v| v.trim() == "AUDITED")
            .unwrap_or(false);

        let mut audit_result = BTreeMap::new();
        let mut cvr_result = BTreeMap::new();
        let mut discrepancy = BTreeMap::new();

        for (col, header) in headers.iter().enumerate() {
            let value = record.get(col).unwrap_or_default();
            if header.starts_with(CVR_RESULT_PREFIX) {
                cvr_result.insert(fix_contest_name(header, CVR_RESULT_PREFIX), fix_value(value));
            } else if header.starts_with(AUDIT_RESULT_PREFIX) {
                audit_result
                    .insert(fix_contest_name(header, AUDIT_RESULT_PREFIX), fix_value(value));
            } else if header.starts_with(DISCREPANCY_PREFIX) {
                discrepancy
                    .insert(fix_contest_name(header, DISCREPANCY_PREFIX), fix_value(value));
            }
        }

        sampled.push(SampledBallot {
            imprinted_id: imprinted_id.to_owned(),
            audited,
            audit_result,
            cvr_result,
            discrepancy,
        });
    }

    Ok(sampled)
}

/// A disagreement between a sampled row's `CVR Result` and the decryption of
/// the stored ciphertext ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditMismatch {
    pub imprinted_id: String,
    pub ballot_id: String,
    pub contest: String,

    /// The `CVR Result` cell, comma-joined candidate names or none.
    pub expected: Option<String>,

    /// What the stored ciphertexts decrypt to, comma-joined or none.
    pub decrypted: Option<String>,
}

/// Checks every audited sampled row against the stored encrypted ballots.
///
/// The master seed lets the tallying authority re-derive each selection's
/// nonce; the stored ciphertexts then decrypt without the secret key.
/// Returns the list of mismatches (empty means the sample reconciles).
/// Rows not marked `AUDITED` are skipped.
pub fn reconcile_audit(
    fixed_parameters: &FixedParameters,
    results: &TallyResults,
    master_seed: &HValue,
    sampled: &[SampledBallot],
) -> VetResult<Vec<AuditMismatch>> {
    let encrypter = BallotEncrypter::new(
        fixed_parameters,
        &results.election,
        &results.context,
        master_seed,
        0,
    );

    let mut mismatches = Vec::new();

    for row in sampled {
        if !row.audited {
            continue;
        }

        let Some(ballot_id) = results
            .metadata
            .imprinted_to_ballot_id
            .get(&row.imprinted_id)
        else {
            return Err(VetError::SampledBallotUnknown {
                imprinted_id: row.imprinted_id.clone(),
            });
        };

        let Some(ballot) = results
            .encrypted_ballots
            .iter()
            .find(|b| b.object_id == *ballot_id)
        else {
            return Err(VetError::BallotNotFound {
                ballot_id: ballot_id.clone(),
            });
        };

        // Decrypt the ballot's selections with re-derived nonces, collecting
        // the chosen option labels per contest label.
        let ballot_seed = encrypter.ballot_seed(&ballot.object_id);
        let mut decrypted: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for contest in &ballot.contests {
            let Some(manifest_contest) = results.election.contest_by_id(&contest.object_id) else {
                return Err(VetError::ContestNotInElection {
                    ballot_id: ballot.object_id.clone(),
                    contest: contest.object_id.clone(),
                });
            };
            let Some(contest_ix) = results.election.contest_index(&contest.object_id) else {
                return Err(VetError::ContestNotInElection {
                    ballot_id: ballot.object_id.clone(),
                    contest: contest.object_id.clone(),
                });
            };

            let chosen = decrypted
                .entry(manifest_contest.label.clone())
                .or_default();

            for (option_ix, selection) in contest.selections.iter().enumerate() {
                let nonce = encrypter.selection_nonce(&ballot_seed, contest_ix, option_ix as u32);
                let Some(vote) = selection.ciphertext.decrypt_with_nonce(
                    fixed_parameters,
                    &results.context.public_key,
                    &nonce,
                    1,
                ) else {
                    return Err(VetError::AuditDecryptFailed {
                        ballot_id: ballot.object_id.clone(),
                        contest: manifest_contest.label.clone(),
                    });
                };

                if vote == 1 {
                    let label = manifest_contest
                        .option_by_id(&selection.object_id)
                        .map(|o| o.label.clone())
                        .unwrap_or_else(|| selection.object_id.clone());
                    chosen.insert(label);
                }
            }
        }

        // Compare against the CVR Result columns. A contest missing from the
        // ballot decrypts to the empty set, matching a none cell.
        for (contest_label, cell) in &row.cvr_result {
            let expected: BTreeSet<String> = cell
                .as_deref()
                .map(|v| v.split(", ").map(|s| s.trim().to_owned()).collect())
                .unwrap_or_default();
            let actual = decrypted.get(contest_label).cloned().unwrap_or_default();

            if expected != actual {
                mismatches.push(AuditMismatch {
                    imprinted_id: row.imprinted_id.clone(),
                    ballot_id: ballot_id.clone(),
                    contest: contest_label.clone(),
                    expected: cell.clone(),
                    decrypted: if actual.is_empty() {
                        None
                    } else {
                        Some(actual.into_iter().collect::<Vec<_>>().join(", "))
                    },
                });
            }
        }
    }

    info!(
        "reconcile_audit: {} audited rows checked, {} mismatches",
        sampled.iter().filter(|s| s.audited).count(),
        mismatches.len()
    );

    Ok(mismatches)
}
