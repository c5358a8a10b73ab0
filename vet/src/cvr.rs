// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Reader for tabular cast-vote-record exports.
//!
//! The expected shape, after the widely-used tabulator export format:
//!
//! - row 1: election title (first cell) and optionally the jurisdiction;
//! - row 2: contest names spanning each contest's column cluster, with an
//!   optional `(Vote For=k)` suffix (cells between cluster starts are empty
//!   and inherit the contest to their left);
//! - row 3: choice names, which may contain embedded newlines;
//! - row 4: header names for the leading metadata columns (`CvrNumber`,
//!   `ImprintedId`, `BallotType`, ...);
//! - rows 5+: one ballot per row. Selection cells are `0`, `1`, or empty
//!   (no mark); metadata cells are strings.
//!
//! A contest whose cells are all empty on a row is taken to be absent from
//! that ballot's style. Values other than 0/1 are rejected later, at
//! encryption time, as fatal input errors.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::{
    ballot::{PlaintextBallot, PlaintextContest, PlaintextSelection},
    election_manifest::{Contest, ContestOption, ElectionManifest, parse_contest_header},
    election_metadata::ElectionMetadata,
    errors::{VetError, VetResult},
};

/// A parsed CVR export: the derived election description, metadata, and one
/// plaintext ballot per data row.
#[derive(Debug, Clone)]
pub struct CvrExport {
    pub election: ElectionManifest,
    pub metadata: ElectionMetadata,
    pub ballots: Vec<PlaintextBallot>,
}

/// Header names accepted for the imprinted-id metadata column.
const IMPRINTED_ID_HEADERS: [&str; 2] = ["ImprintedId", "Imprinted ID"];

/// Replaces embedded newlines (candidate names sometimes carry them) and
/// trims.
fn fix_cell(cell: &str) -> String {
    cell.replace(['\r', '\n'], " ").trim().to_owned()
}

/// Reads a CVR export from a file path.
pub fn read_cvr_csv_path(path: &Path) -> VetResult<CvrExport> {
    let file = std::fs::File::open(path).map_err(|e| VetError::io(path, e))?;
    read_cvr_csv(file)
}

/// Reads a CVR export from any reader.
pub fn read_cvr_csv<R: Read>(reader: R) -> VetResult<CvrExport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows: Vec<csv::StringRecord> = Vec::new();
    for record in csv_reader.records() {
        rows.push(record.map_err(|e| VetError::CvrParse(e.to_string()))?);
    }

    if rows.len() < 4 {
        return Err(VetError::CvrParse(format!(
            "expected at least 4 header rows, found {}",
            rows.len()
        )));
    }

    let title_row = &rows[0];
    let contest_row = &rows[1];
    let choice_row = &rows[2];
    let header_row = &rows[3];

    let election_title = fix_cell(title_row.get(0).unwrap_or_default());
    if election_title.is_empty() {
        return Err(VetError::CvrParse("missing election title".to_owned()));
    }
    let jurisdiction = title_row
        .get(1)
        .map(fix_cell)
        .filter(|s| !s.is_empty());

    let cnt_columns = contest_row.len().max(choice_row.len()).max(header_row.len());

    // Forward-fill the contest row across each cluster. Columns before the
    // first contest cell are ballot metadata.
    struct ContestColumns {
        label: String,
        selection_limit: u32,
        /// (column index, choice label) in column order.
        choices: Vec<(usize, String)>,
    }

    let mut contests: Vec<ContestColumns> = Vec::new();
    let mut metadata_columns: Vec<(usize, String)> = Vec::new();

    // Exports either repeat the contest name in every column of its cluster
    // or write it once and leave the rest blank; both forward-fill the same
    // way. A new cluster starts where a nonempty cell differs from the
    // current one.
    let mut current_header: Option<String> = None;

    for col in 0..cnt_columns {
        let contest_cell = fix_cell(contest_row.get(col).unwrap_or_default());
        if !contest_cell.is_empty() && current_header.as_deref() != Some(contest_cell.as_str()) {
            let (label, selection_limit) = parse_contest_header(&contest_cell);
            contests.push(ContestColumns {
                label,
                selection_limit,
                choices: Vec::new(),
            });
            current_header = Some(contest_cell);
        }

        match contests.last_mut() {
            Some(contest) => {
                let choice = fix_cell(choice_row.get(col).unwrap_or_default());
                if choice.is_empty() {
                    return Err(VetError::CvrParse(format!(
                        "contest `{}`: selection column {col} has no choice name",
                        contest.label
                    )));
                }
                contest.choices.push((col, choice));
            }
            None => {
                let header = fix_cell(header_row.get(col).unwrap_or_default());
                metadata_columns.push((col, header));
            }
        }
    }

    if contests.is_empty() {
        return Err(VetError::CvrParse("no contest columns found".to_owned()));
    }

    let imprinted_id_column = metadata_columns
        .iter()
        .find(|(_, header)| IMPRINTED_ID_HEADERS.contains(&header.as_str()))
        .map(|(col, _)| *col);

    // The derived election description, with stable object ids assigned in
    // column order.
    let election = ElectionManifest {
        title: election_title.clone(),
        jurisdiction,
        contests: contests
            .iter()
            .enumerate()
            .map(|(i, c)| Contest {
                object_id: format!("c{:04}", i + 1),
                label: c.label.clone(),
                selection_limit: c.selection_limit,
                options: c
                    .choices
                    .iter()
                    .enumerate()
                    .map(|(j, (_, choice))| ContestOption {
                        object_id: format!("c{:04}-o{:04}", i + 1, j + 1),
                        label: choice.clone(),
                        is_write_in: choice.starts_with("Write-in"),
                    })
                    .collect(),
            })
            .collect(),
    };

    // Data rows become plaintext ballots, `b` + 7-digit sequence number.
    let mut ballots = Vec::new();
    let mut ballot_id_to_imprinted = BTreeMap::new();
    let mut imprinted_to_ballot_id = BTreeMap::new();

    for row in rows[4..].iter().filter(|r| !row_is_empty(r)) {
        let object_id = format!("b{:07}", ballots.len() + 1);

        let imprinted_id = imprinted_id_column
            .map(|col| fix_cell(row.get(col).unwrap_or_default()))
            .filter(|s| !s.is_empty());
        if let Some(imprinted) = &imprinted_id {
            ballot_id_to_imprinted.insert(object_id.clone(), imprinted.clone());
            imprinted_to_ballot_id.insert(imprinted.clone(), object_id.clone());
        }

        let mut ballot_contests = Vec::new();
        for (i, contest) in contests.iter().enumerate() {
            let cells: Vec<String> = contest
                .choices
                .iter()
                .map(|(col, _)| fix_cell(row.get(*col).unwrap_or_default()))
                .collect();

            // All-empty cluster: the contest is not on this ballot's style.
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            let mut selections = Vec::new();
            for (j, cell) in cells.iter().enumerate() {
                let vote = if cell.is_empty() {
                    0
                } else {
                    cell.parse::<u64>().map_err(|_| {
                        VetError::CvrParse(format!(
                            "ballot `{object_id}` contest `{}`: unparseable selection cell {cell:?}",
                            contest.label
                        ))
                    })?
                };
                selections.push(PlaintextSelection {
                    object_id: format!("c{:04}-o{:04}", i + 1, j + 1),
                    vote,
                    write_in: None,
                });
            }

            ballot_contests.push(PlaintextContest {
                object_id: format!("c{:04}", i + 1),
                selections,
            });
        }

        ballots.push(PlaintextBallot {
            object_id,
            imprinted_id,
            contests: ballot_contests,
        });
    }

    info!(
        "read_cvr_csv: {} ballots, {} contests ({})",
        ballots.len(),
        election.contests.len(),
        election_title
    );

    let metadata = ElectionMetadata {
        election_name: election_title,
        ballot_count: ballots.len() as u64,
        contest_vote_limits: election
            .contests
            .iter()
            .map(|c| (c.label.clone(), c.selection_limit))
            .collect(),
        ballot_id_to_imprinted,
        imprinted_to_ballot_id,
    };

    Ok(CvrExport {
        election,
        metadata,
        ballots,
    })
}

fn row_is_empty(row: &csv::StringRecord) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}
