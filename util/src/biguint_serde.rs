// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Serde helpers rendering `BigUint` values as uppercase hex strings.
//!
//! For use with `#[serde(with = "util::biguint_serde")]`. Hex strings keep
//! published JSON artifacts readable and platform-independent.

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serializer};

use crate::base16::{biguint_from_hex, biguint_to_hex};

pub fn serialize<S: Serializer>(u: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&biguint_to_hex(u))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
    let s = String::deserialize(deserializer)?;
    biguint_from_hex(&s).map_err(serde::de::Error::custom)
}
