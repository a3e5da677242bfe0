//! Hasher Implementation Verification Tests
//!
//! Tests to verify that our hasher implementation correctly uses BLAKE3
//! and that the fingerprint framing is unambiguous.

use cordon::tree::hasher;
use cordon::types::{Hash, DIRECTORY_MARKER};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Test that content hash matches BLAKE3 directly
#[test]
fn test_content_hash_matches_blake3() {
    let content = b"test content";

    let our_hash = hasher::compute_content_hash(content);
    let blake3_hash = *blake3::hash(content).as_bytes();

    assert_eq!(our_hash, blake3_hash);
}

/// Streaming a large file gives the same digest as hashing it in one piece
#[test]
fn test_streamed_file_hash_matches_in_memory_hash() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("big.bin");
    let content: Vec<u8> = (0..(3 * 1024 * 1024 + 17)).map(|i| (i % 251) as u8).collect();
    fs::write(&path, &content).unwrap();

    assert_eq!(
        hasher::hash_file(&path).unwrap(),
        hasher::compute_content_hash(&content)
    );
}

/// Empty files still get a real digest, distinct from the directory marker
#[test]
fn test_empty_file_not_confused_with_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty");
    fs::write(&path, "").unwrap();

    let digest = hasher::hash_file(&path).unwrap();
    assert_eq!(digest, hasher::compute_content_hash(b""));
    assert_ne!(digest, DIRECTORY_MARKER);
}

/// A link and a file holding the link's target text never share a digest
#[test]
fn test_symlink_domain_separated_from_content() {
    let target = Path::new("some/target");
    assert_ne!(
        hasher::hash_symlink_target(target),
        hasher::compute_content_hash(b"some/target")
    );
}

/// Fold matches the documented framing: sorted, `u64 BE key length || key || digest`
#[test]
fn test_fold_framing() {
    let d1: Hash = [1; 32];
    let d2: Hash = [2; 32];

    let mut expected = blake3::Hasher::new();
    for (key, digest) in [("a", &d1), ("bc", &d2)] {
        expected.update(&(key.len() as u64).to_be_bytes());
        expected.update(key.as_bytes());
        expected.update(digest);
    }

    assert_eq!(
        hasher::fold_entries(vec![("bc", &d2), ("a", &d1)]),
        *expected.finalize().as_bytes()
    );
}

/// Moving bytes between key and digest boundaries changes the fold
#[test]
fn test_fold_unambiguous_boundaries() {
    let d: Hash = [7; 32];
    let first = hasher::fold_entries(vec![("ab", &d), ("c", &d)]);
    let second = hasher::fold_entries(vec![("a", &d), ("bc", &d)]);
    assert_ne!(first, second);
}
