// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Non-cryptographic metadata published alongside the tally, connecting
//! ballot object ids back to the paper world (imprinted ids) and recording
//! the contest vote limits for auditors that only read JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionMetadata {
    pub election_name: String,

    /// Number of encrypted ballots in the tally.
    pub ballot_count: u64,

    /// Contest label to its `k` selection limit.
    pub contest_vote_limits: BTreeMap<String, u32>,

    /// Ballot object id to the imprinted id printed on the paper ballot,
    /// for ballots that carried one.
    pub ballot_id_to_imprinted: BTreeMap<String, String>,

    /// The reverse mapping, for audit lookups.
    pub imprinted_to_ballot_id: BTreeMap<String, String>,
}
