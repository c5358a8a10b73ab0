// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Hex encoding helpers for `BigUint` values.

use anyhow::{Result, bail};
use num_bigint::BigUint;
use num_traits::Num;

/// Converts a hex string to a `BigUint`, ignoring ASCII whitespace.
///
/// Intended for compiled-in constants written in the conventional
/// 8-digit-group layout. Any non-hex, non-whitespace character is a usage
/// error caught by the assert.
pub fn hex_to_biguint(s: &str) -> BigUint {
    let compact: String = s.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    assert!(
        compact.chars().all(|c| c.is_ascii_hexdigit()),
        "hex_to_biguint requires hex digits and whitespace only"
    );

    // The `.unwrap_or_default()` can only yield the default for an empty
    // string, which no caller passes.
    BigUint::from_str_radix(&compact, 16).unwrap_or_default()
}

/// Converts a `BigUint` to uppercase hex digits with no prefix.
///
/// The result always has an even number of digits so it round-trips through
/// byte-oriented consumers.
pub fn biguint_to_hex(u: &BigUint) -> String {
    let mut s = u.to_str_radix(16);
    s.make_ascii_uppercase();
    if s.len() % 2 != 0 {
        s.insert(0, '0');
    }
    s
}

/// Parses an uppercase or lowercase hex string with no prefix into a `BigUint`.
pub fn biguint_from_hex(s: &str) -> Result<BigUint> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("invalid hex number: {s:?}");
    }
    Ok(BigUint::from_str_radix(s, 16)?)
}
