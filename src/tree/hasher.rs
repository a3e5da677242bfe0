//! Hash computation for filesystem entries using BLAKE3

use crate::error::StorageError;
use crate::tree::snapshot::{DirectorySnapshot, Snapshotter};
use crate::types::Hash;
use blake3::Hasher;
use std::fs::File;
use std::path::Path;

const SYMLINK_CONTEXT: &str = "cordon 2024-06 symlink target";

/// Compute content hash for file bytes
pub fn compute_content_hash(content: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    *hasher.finalize().as_bytes()
}

/// Hash a file's content by streaming it through BLAKE3.
///
/// The digest depends only on the bytes, so it equals `compute_content_hash` of the
/// whole file whatever the read chunking.
pub fn hash_file(path: &Path) -> Result<Hash, StorageError> {
    let mut file = File::open(path).map_err(|e| StorageError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut hasher = Hasher::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| StorageError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(*hasher.finalize().as_bytes())
}

/// Digest recorded for a symbolic link: its target, in a separate hash domain so a link
/// never collides with a regular file holding the same bytes.
pub fn hash_symlink_target(target: &Path) -> Hash {
    let mut hasher = Hasher::new_derive_key(SYMLINK_CONTEXT);
    hasher.update(target.as_os_str().as_encoded_bytes());
    *hasher.finalize().as_bytes()
}

/// Fold (key, digest) pairs into one aggregate digest.
///
/// Entries are sorted by key first, so the result does not depend on the order they were
/// collected in. Each entry is framed as `key_len || key || digest`.
pub fn fold_entries<'a, I>(entries: I) -> Hash
where
    I: IntoIterator<Item = (&'a str, &'a Hash)>,
{
    let mut entries: Vec<(&str, &Hash)> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Hasher::new();
    for (key, digest) in entries {
        hasher.update(&(key.len() as u64).to_be_bytes());
        hasher.update(key.as_bytes());
        hasher.update(digest);
    }
    *hasher.finalize().as_bytes()
}

/// Fingerprint of an already captured snapshot
pub fn fingerprint_of(snapshot: &DirectorySnapshot) -> Hash {
    fold_entries(snapshot.iter().map(|(k, v)| (k.as_str(), v)))
}

/// Aggregate fingerprint of a directory tree
pub fn fingerprint(root: &Path) -> Result<Hash, StorageError> {
    Ok(Snapshotter::new().capture(root)?.fingerprint)
}
