// Copyright (C) Microsoft Corporation. All rights reserved.

#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Content-addressed storage under a root directory.
//!
//! Every file written through a [`Manifest`] is recorded as (SHA-256,
//! byte length) under a platform-independent logical name: path segments
//! joined with `|`, never the host separator, so the same sealed tree hashes
//! identically on any platform. Sealing writes `MANIFEST.json`, whose map
//! covers every other file in the tree; after sealing only reads are legal.
//!
//! Ballot files shard into subdirectories keyed by the first four characters
//! of the ballot id: a million ballots in one directory is hostile to every
//! filesystem tool, sharding at 10^4 keeps each leaf manageable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{
    ballot::CiphertextBallot,
    errors::{VetError, VetResult},
};

pub const MANIFEST_FILE: &str = "MANIFEST.json";

/// Subdirectory holding the sharded ballot files.
pub const BALLOTS_DIR: &str = "ballots";

/// Length of the ballot-id prefix used as the shard directory name.
const BALLOT_SHARD_PREFIX_LEN: usize = 4;

/// What we remember about a written file: its SHA-256 (base-64) and length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// SHA-256 hash of the file bytes, standard base-64 with padding.
    pub hash: String,

    /// Length of the file in bytes.
    pub num_bytes: u64,
}

/// The on-disk representation of a [`Manifest`]: everything except the root
/// directory, which would make no sense to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestExternal {
    hashes: BTreeMap<String, FileInfo>,
    bytes_written: u64,
}

/// A hash-verified view of the files under a root directory.
///
/// Construct with [`Manifest::fresh`] or [`Manifest::existing`], never
/// directly. Workers hold private partial manifests over the same root and
/// the coordinator merges them, so no lock is needed during a parallel write
/// phase.
#[derive(Debug)]
pub struct Manifest {
    root: PathBuf,
    hashes: BTreeMap<String, FileInfo>,
    bytes_written: u64,
    sealed: bool,
}

impl Manifest {
    /// An empty manifest over `root`, creating the directory if needed and
    /// wiping it first when `delete_existing`.
    pub fn fresh(root: &Path, delete_existing: bool) -> VetResult<Manifest> {
        if delete_existing && root.exists() {
            std::fs::remove_dir_all(root).map_err(|e| VetError::io(root, e))?;
        }
        std::fs::create_dir_all(root).map_err(|e| VetError::io(root, e))?;

        Ok(Manifest {
            root: root.to_path_buf(),
            hashes: BTreeMap::new(),
            bytes_written: 0,
            sealed: false,
        })
    }

    /// Loads a sealed manifest from `root/MANIFEST.json`.
    pub fn existing(root: &Path) -> VetResult<Manifest> {
        let manifest_path = root.join(MANIFEST_FILE);
        let bytes = std::fs::read(&manifest_path).map_err(|e| VetError::ManifestUnreadable {
            root: root.display().to_string(),
            reason: e.to_string(),
        })?;
        let external: ManifestExternal =
            serde_json::from_slice(&bytes).map_err(|e| VetError::ManifestUnreadable {
                root: root.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Manifest {
            root: root.to_path_buf(),
            hashes: external.hashes,
            bytes_written: external.bytes_written,
            sealed: true,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Iterates the recorded (logical name, [`FileInfo`]) entries.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &FileInfo)> {
        self.hashes.iter()
    }

    pub fn contains(&self, manifest_name: &str) -> bool {
        self.hashes.contains_key(manifest_name)
    }

    /// Writes `bytes` under the logical name formed from `name_parts` and
    /// records its hash. Re-writing a name with identical content warns;
    /// re-writing with different content fails.
    pub fn write_file(&mut self, name_parts: &[&str], bytes: &[u8]) -> VetResult<String> {
        if self.sealed {
            return Err(VetError::ManifestSealed {
                root: self.root.display().to_string(),
            });
        }

        let manifest_name = compose_manifest_name(name_parts);
        let file_info = FileInfo {
            hash: sha256_b64(bytes),
            num_bytes: bytes.len() as u64,
        };

        if let Some(prior) = self.hashes.get(&manifest_name) {
            if *prior != file_info {
                return Err(VetError::ManifestOverwriteConflict {
                    name: manifest_name,
                });
            }
            warn!(name = %manifest_name, "re-writing an already-written file with identical content");
        }

        let full_path = compose_filename(&self.root, name_parts);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VetError::io(parent, e))?;
        }
        std::fs::write(&full_path, bytes).map_err(|e| VetError::io(&full_path, e))?;

        self.bytes_written += file_info.num_bytes;
        let hash = file_info.hash.clone();
        self.hashes.insert(manifest_name, file_info);
        Ok(hash)
    }

    /// Serializes `value` as JSON and writes it through [`Manifest::write_file`].
    pub fn write_json_file<T: Serialize>(
        &mut self,
        name_parts: &[&str],
        value: &T,
    ) -> VetResult<String> {
        let bytes = serde_json::to_vec(value).map_err(|e| VetError::Json {
            name: compose_manifest_name(name_parts),
            reason: e.to_string(),
        })?;
        self.write_file(name_parts, &bytes)
    }

    /// Reads the file under the logical name formed from `name_parts`,
    /// verifying its recorded length and hash.
    pub fn read_file(&self, name_parts: &[&str]) -> VetResult<Vec<u8>> {
        self.read_manifest_name(&compose_manifest_name(name_parts))
    }

    /// Reads and verifies a file by its logical manifest name.
    pub fn read_manifest_name(&self, manifest_name: &str) -> VetResult<Vec<u8>> {
        let Some(file_info) = self.hashes.get(manifest_name) else {
            return Err(VetError::ManifestEntryMissing {
                name: manifest_name.to_owned(),
            });
        };

        let full_path = manifest_name_to_filename(&self.root, manifest_name);
        let bytes = std::fs::read(&full_path).map_err(|e| VetError::io(&full_path, e))?;

        if bytes.len() as u64 != file_info.num_bytes {
            return Err(VetError::FileLengthMismatch {
                name: manifest_name.to_owned(),
                expected: file_info.num_bytes,
                actual: bytes.len() as u64,
            });
        }

        let actual = sha256_b64(&bytes);
        if actual != file_info.hash {
            return Err(VetError::FileHashMismatch {
                name: manifest_name.to_owned(),
                expected: file_info.hash.clone(),
                actual,
            });
        }

        Ok(bytes)
    }

    /// Reads, verifies, and deserializes a JSON file.
    pub fn read_json_file<T: serde::de::DeserializeOwned>(
        &self,
        name_parts: &[&str],
    ) -> VetResult<T> {
        let bytes = self.read_file(name_parts)?;
        serde_json::from_slice(&bytes).map_err(|e| VetError::Json {
            name: compose_manifest_name(name_parts),
            reason: e.to_string(),
        })
    }

    /// Merges another partial manifest into this one. Both must share the
    /// same root; any shared logical name must agree exactly.
    pub fn merge_from(&mut self, other: Manifest) -> VetResult<()> {
        if self.root != other.root {
            return Err(VetError::ManifestRootMismatch {
                left: self.root.display().to_string(),
                right: other.root.display().to_string(),
            });
        }
        if self.sealed {
            return Err(VetError::ManifestSealed {
                root: self.root.display().to_string(),
            });
        }

        for (name, info) in &other.hashes {
            if let Some(prior) = self.hashes.get(name) {
                if prior != info {
                    return Err(VetError::ManifestMergeConflict { name: name.clone() });
                }
            }
        }

        self.hashes.extend(other.hashes);
        self.bytes_written += other.bytes_written;
        Ok(())
    }

    /// Writes `MANIFEST.json` as the final artifact and freezes the manifest.
    /// The manifest file covers every other file; it does not list itself.
    pub fn seal(&mut self) -> VetResult<String> {
        if self.sealed {
            return Err(VetError::ManifestSealed {
                root: self.root.display().to_string(),
            });
        }

        let external = ManifestExternal {
            hashes: self.hashes.clone(),
            bytes_written: self.bytes_written,
        };
        let bytes = serde_json::to_vec(&external).map_err(|e| VetError::Json {
            name: MANIFEST_FILE.to_owned(),
            reason: e.to_string(),
        })?;

        let path = self.root.join(MANIFEST_FILE);
        std::fs::write(&path, &bytes).map_err(|e| VetError::io(&path, e))?;

        self.sealed = true;
        Ok(sha256_b64(&bytes))
    }

    /// Diagnostic: true iff no two entries share a hash value.
    ///
    /// Advisory only. Two ballots with identical plaintexts still encrypt to
    /// different bytes because their nonces derive from distinct ballot ids,
    /// so in practice a duplicate hash means a seed or nonce reuse bug, or a
    /// copied file. Treated as a warning, never an error.
    pub fn all_hashes_unique(&self) -> bool {
        let expected = self.hashes.len();
        let actual = self
            .hashes
            .values()
            .map(|info| info.hash.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        expected == actual
    }

    /// Writes a ciphertext ballot into its shard directory,
    /// `ballots/<prefix>/<id>.json`.
    pub fn write_ciphertext_ballot(&mut self, ballot: &CiphertextBallot) -> VetResult<String> {
        let file_name = format!("{}.json", ballot.object_id);
        let prefix = ballot_shard_prefix(&ballot.object_id);
        self.write_json_file(&[BALLOTS_DIR, prefix, &file_name], ballot)
    }

    /// Loads and verifies a ciphertext ballot by id.
    pub fn load_ciphertext_ballot(&self, ballot_id: &str) -> VetResult<CiphertextBallot> {
        let file_name = format!("{ballot_id}.json");
        let prefix = ballot_shard_prefix(ballot_id);
        match self.read_json_file(&[BALLOTS_DIR, prefix, &file_name]) {
            Err(VetError::ManifestEntryMissing { .. }) => Err(VetError::BallotNotFound {
                ballot_id: ballot_id.to_owned(),
            }),
            other => other,
        }
    }
}

/// The shard directory name for a ballot id: its leading four characters.
fn ballot_shard_prefix(ballot_id: &str) -> &str {
    let end = ballot_id
        .char_indices()
        .nth(BALLOT_SHARD_PREFIX_LEN)
        .map(|(ix, _)| ix)
        .unwrap_or(ballot_id.len());
    &ballot_id[..end]
}

/// The platform-independent logical name: segments joined with `|`.
///
/// Distinct from [`compose_filename`] because it must give the same answer on
/// any platform; that is why it uses vertical bars rather than forward or
/// backward slashes.
pub fn compose_manifest_name(name_parts: &[&str]) -> String {
    name_parts.join("|")
}

/// The concrete path for a logical name's parts, using the host separator.
pub fn compose_filename(root: &Path, name_parts: &[&str]) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in name_parts {
        path.push(part);
    }
    path
}

/// Maps a logical manifest name back to its path under `root`.
pub fn manifest_name_to_filename(root: &Path, manifest_name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in manifest_name.split('|') {
        path.push(part);
    }
    path
}

/// SHA-256 over the given bytes, standard base-64 with padding.
pub fn sha256_b64(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    Base64::encode_string(&digest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn name_composition() {
        assert_eq!(compose_manifest_name(&["MANIFEST.json"]), "MANIFEST.json");
        assert_eq!(
            compose_manifest_name(&["ballots", "b000", "b0000001.json"]),
            "ballots|b000|b0000001.json"
        );

        let root = Path::new("root");
        assert_eq!(
            manifest_name_to_filename(root, "ballots|b000|b0000001.json"),
            root.join("ballots").join("b000").join("b0000001.json")
        );
        assert_eq!(
            compose_filename(root, &["ballots", "b000", "b0000001.json"]),
            manifest_name_to_filename(root, "ballots|b000|b0000001.json")
        );
    }

    #[test]
    fn sha256_b64_known_value() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_b64(b""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::fresh(dir.path(), false).unwrap();

        manifest
            .write_file(&["sub", "hello.txt"], b"hello world")
            .unwrap();
        assert_eq!(
            manifest.read_file(&["sub", "hello.txt"]).unwrap(),
            b"hello world"
        );

        // Unknown names are missing entries.
        let err = manifest.read_file(&["nope.txt"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::StorageIntegrity);
    }

    #[test]
    fn tampering_detected_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::fresh(dir.path(), false).unwrap();
        manifest.write_file(&["data.txt"], b"original contents").unwrap();

        std::fs::write(dir.path().join("data.txt"), b"tampered contents!").unwrap();
        let err = manifest.read_file(&["data.txt"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::StorageIntegrity);

        // Same length, different bytes: caught by the hash, not the length.
        std::fs::write(dir.path().join("data.txt"), b"original contents").unwrap();
        let err = manifest.read_file(&["data.txt"]).err().unwrap();
        assert!(matches!(err, VetError::FileHashMismatch { .. }));
    }

    #[test]
    fn conflicting_rewrite_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::fresh(dir.path(), false).unwrap();
        manifest.write_file(&["a.txt"], b"one").unwrap();

        // Identical content: allowed (with a warning).
        manifest.write_file(&["a.txt"], b"one").unwrap();

        let err = manifest.write_file(&["a.txt"], b"two").err().unwrap();
        assert!(matches!(err, VetError::ManifestOverwriteConflict { .. }));
    }

    #[test]
    fn merge_agrees_or_fails() {
        let dir = tempfile::tempdir().unwrap();

        let mut left = Manifest::fresh(dir.path(), false).unwrap();
        left.write_file(&["a.txt"], b"aaa").unwrap();
        left.write_file(&["shared.txt"], b"both").unwrap();

        let mut right = Manifest::fresh(dir.path(), false).unwrap();
        right.write_file(&["b.txt"], b"bbb").unwrap();
        right.write_file(&["shared.txt"], b"both").unwrap();

        left.merge_from(right).unwrap();
        assert!(left.contains("a.txt") && left.contains("b.txt") && left.contains("shared.txt"));

        let mut conflicting = Manifest::fresh(dir.path(), false).unwrap();
        conflicting.write_file(&["c.txt"], b"ccc").unwrap();
        conflicting.hashes.insert(
            "a.txt".to_owned(),
            FileInfo {
                hash: sha256_b64(b"different"),
                num_bytes: 9,
            },
        );
        let err = left.merge_from(conflicting).err().unwrap();
        assert!(matches!(err, VetError::ManifestMergeConflict { .. }));
    }

    #[test]
    fn merge_is_commutative_after_seal() {
        let dir_ab = tempfile::tempdir().unwrap();
        let dir_ba = tempfile::tempdir().unwrap();

        let build = |root: &Path, flip: bool| -> Vec<u8> {
            let mut first = Manifest::fresh(root, false).unwrap();
            first.write_file(&["a.txt"], b"aaa").unwrap();
            let mut second = Manifest::fresh(root, false).unwrap();
            second.write_file(&["b.txt"], b"bbbb").unwrap();

            let mut combined = if flip { second } else { first };
            let other = if flip {
                let mut m = Manifest::fresh(root, false).unwrap();
                m.write_file(&["a.txt"], b"aaa").unwrap();
                m
            } else {
                let mut m = Manifest::fresh(root, false).unwrap();
                m.write_file(&["b.txt"], b"bbbb").unwrap();
                m
            };
            combined.merge_from(other).unwrap();
            combined.seal().unwrap();
            std::fs::read(root.join(MANIFEST_FILE)).unwrap()
        };

        assert_eq!(build(dir_ab.path(), false), build(dir_ba.path(), true));
    }

    #[test]
    fn sealed_manifest_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::fresh(dir.path(), false).unwrap();
        manifest.write_file(&["a.txt"], b"aaa").unwrap();
        manifest.seal().unwrap();

        let err = manifest.write_file(&["b.txt"], b"bbb").err().unwrap();
        assert!(matches!(err, VetError::ManifestSealed { .. }));

        // And it loads back with verifying reads intact.
        let loaded = Manifest::existing(dir.path()).unwrap();
        assert_eq!(loaded.read_file(&["a.txt"]).unwrap(), b"aaa");
        assert!(loaded.all_hashes_unique());
    }

    #[test]
    fn fresh_can_wipe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("leftover.txt"), b"junk").unwrap();

        let manifest = Manifest::fresh(dir.path(), true).unwrap();
        assert!(!dir.path().join("leftover.txt").exists());
        drop(manifest);
    }
}
