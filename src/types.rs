//! Shared primitive types

/// 32-byte BLAKE3 digest
pub type Hash = [u8; 32];

/// Marker digest recorded for every directory entry.
///
/// Directories carry no content of their own; the marker makes their presence (and absence)
/// visible to fingerprints and diffs.
pub const DIRECTORY_MARKER: Hash = [0u8; 32];

/// Hex-encode a digest for display and serialization
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Short hex form used in human-readable output
pub fn short_hex(hash: &Hash) -> String {
    let mut s = hex::encode(hash);
    s.truncate(12);
    s
}
