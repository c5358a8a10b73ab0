// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The election description: contests, their options, and selection limits.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{VetError, VetResult},
    hash::{HValue, vet_h},
};

/// One selectable option within a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestOption {
    /// Stable identifier, `c####-o####`.
    pub object_id: String,

    /// The option label as it appeared in the CVR (candidate name, or
    /// `Write-in`).
    pub label: String,

    /// True for a write-in slot. Only the 0/1 indicator of a write-in is
    /// encrypted; any written text rides along as an opaque payload.
    #[serde(default)]
    pub is_write_in: bool,
}

/// A "vote for up to `selection_limit`" contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    /// Stable identifier, `c####`.
    pub object_id: String,

    /// The contest label, with any `(Vote For=k)` suffix stripped.
    pub label: String,

    /// The `k` of this k-of-n contest.
    pub selection_limit: u32,

    pub options: Vec<ContestOption>,
}

impl Contest {
    pub fn option_by_id(&self, object_id: &str) -> Option<&ContestOption> {
        self.options.iter().find(|o| o.object_id == object_id)
    }
}

/// The ordered set of contests for an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionManifest {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,

    pub contests: Vec<Contest>,
}

impl ElectionManifest {
    pub fn contest_by_id(&self, object_id: &str) -> Option<&Contest> {
        self.contests.iter().find(|c| c.object_id == object_id)
    }

    /// The 0-based position of a contest, used for nonce derivation.
    pub fn contest_index(&self, object_id: &str) -> Option<u32> {
        self.contests
            .iter()
            .position(|c| c.object_id == object_id)
            .map(|ix| ix as u32)
    }

    /// Canonical serialized form: the bytes that get hashed and published.
    pub fn canonical_bytes(&self) -> VetResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| VetError::Json {
            name: "election description".to_owned(),
            reason: e.to_string(),
        })
    }

    /// `H(0^32; 0x01 | canonical bytes)`.
    pub fn manifest_hash(&self) -> VetResult<HValue> {
        let mut v = vec![0x01];
        v.extend_from_slice(&self.canonical_bytes()?);
        Ok(vet_h(&HValue::default(), &v))
    }
}

/// Splits a CVR contest header into its label and `k` bound.
///
/// A trailing `(Vote For=k)` is parsed and stripped; absent or malformed,
/// the bound defaults to 1.
pub fn parse_contest_header(header: &str) -> (String, u32) {
    let trimmed = header.trim();

    for open in ["(Vote For=", "(Vote for=", "(vote for="] {
        if let Some(pos) = trimmed.rfind(open) {
            let rest = &trimmed[pos + open.len()..];
            if let Some(close) = rest.find(')') {
                if let Ok(k) = rest[..close].trim().parse::<u32>() {
                    let label = trimmed[..pos].trim_end().to_owned();
                    return (label, k.max(1));
                }
            }
        }
    }

    (trimmed.to_owned(), 1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contest_header_parsing() {
        assert_eq!(
            parse_contest_header("County Supervisor (Vote For=2)"),
            ("County Supervisor".to_owned(), 2)
        );
        assert_eq!(
            parse_contest_header("Measure P"),
            ("Measure P".to_owned(), 1)
        );
        assert_eq!(
            parse_contest_header("  City Treasurer (Vote For=1) "),
            ("City Treasurer".to_owned(), 1)
        );
        // A malformed suffix is left in place with the default bound.
        assert_eq!(
            parse_contest_header("Odd Contest (Vote For=x)"),
            ("Odd Contest (Vote For=x)".to_owned(), 1)
        );
    }
}
