// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! The hash function `H` used for Fiat-Shamir challenges, tracking hashes,
//! and nonce derivation.
//!
//! `H(key, data)` is HMAC-SHA-256 with a 32-byte key, so the output of one
//! invocation can key the next. The construction makes the output timing
//! independent of the key contents.

use digest::{FixedOutput, Update};
use hmac::{Hmac, Mac};
use util::algebra::{FieldElement, ScalarField};

type HmacSha256 = Hmac<sha2::Sha256>;

pub const HVALUE_BYTE_LEN: usize = 32;

pub type HValueByteArray = [u8; HVALUE_BYTE_LEN];

/// A hash output value of `H`, also usable as the key of a subsequent `H`.
#[derive(Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HValue(pub HValueByteArray);

impl HValue {
    /// Renders as uppercase hex digits, no prefix.
    fn to_hex(&self) -> String {
        let mut s = String::with_capacity(HVALUE_BYTE_LEN * 2);
        for by in self.0 {
            s.push_str(&format!("{by:02X}"));
        }
        s
    }

    fn from_hex(s: &str) -> Option<HValue> {
        if s.len() != HVALUE_BYTE_LEN * 2 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let mut arr = [0u8; HVALUE_BYTE_LEN];
        for (i, by) in arr.iter_mut().enumerate() {
            *by = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(HValue(arr))
    }
}

impl AsRef<[u8]> for HValue {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<HValueByteArray> for HValue {
    fn from(value: HValueByteArray) -> Self {
        HValue(value)
    }
}

impl std::fmt::Display for HValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for HValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl serde::Serialize for HValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for HValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::Deserialize;
        let s = String::deserialize(deserializer)?;
        HValue::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hash value: {s:?}")))
    }
}

/// The hash function `H(key; data)`: HMAC-SHA-256 with a 32-byte key.
pub fn vet_h<D: AsRef<[u8]>>(key: &HValue, data: D) -> HValue {
    // `unwrap()` is justified here because `HmacSha256::new_from_slice()`
    // only fails on a key of unacceptable size, and ours is fixed at 32 bytes.
    #[allow(clippy::unwrap_used)]
    let hmac_sha256 = HmacSha256::new_from_slice(key.as_ref()).unwrap();

    let arr: HValueByteArray =
        AsRef::<HValueByteArray>::as_ref(&hmac_sha256.chain(data.as_ref()).finalize_fixed()).to_owned();
    HValue(arr)
}

/// `H(key; data)` reduced into the field `Z_q`.
pub fn vet_h_q<D: AsRef<[u8]>>(key: &HValue, data: D, field: &ScalarField) -> FieldElement {
    let hv = vet_h(key, data);
    FieldElement::from_bytes_be(hv.as_ref(), field)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    #[test]
    fn distinct_keys_distinct_outputs() {
        let k0 = HValue::default();
        let k1 = vet_h(&k0, b"x");
        assert_ne!(vet_h(&k0, b"data"), vet_h(&k1, b"data"));
        assert_ne!(vet_h(&k0, b"data"), vet_h(&k0, b"datb"));
        assert_eq!(vet_h(&k0, b"data"), vet_h(&k0, b"data"));
    }

    #[test]
    fn hex_serde_round_trip() {
        let h = vet_h(&HValue::default(), b"serde");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json.len(), 2 + 64);
        let back: HValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(serde_json::from_str::<HValue>("\"abc\"").is_err());
        let s = format!("\"{}\"", "ZZ".repeat(32));
        assert!(serde_json::from_str::<HValue>(&s).is_err());
    }
}
