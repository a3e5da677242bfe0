//! Directory snapshots: one digest per entry, keyed by relative path

use crate::error::StorageError;
use crate::tree::hasher;
use crate::tree::path;
use crate::tree::walker::{Entry, Walker, WalkerConfig};
use crate::types::{Hash, DIRECTORY_MARKER};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, trace};

/// Per-entry digest map for one directory at one instant.
///
/// Keys are `/`-separated paths relative to the snapshotted root. Directory keys end in `/`
/// and map to [`DIRECTORY_MARKER`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    entries: BTreeMap<String, Hash>,
}

impl DirectorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry. Returns the previous digest if the key was already present.
    pub fn insert(&mut self, key: String, digest: Hash) -> Option<Hash> {
        self.entries.insert(key, digest)
    }

    pub fn get(&self, key: &str) -> Option<&Hash> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Hash> {
        self.entries.iter()
    }

    /// Aggregate fingerprint of everything in this snapshot
    pub fn fingerprint(&self) -> Hash {
        hasher::fingerprint_of(self)
    }
}

impl FromIterator<(String, Hash)> for DirectorySnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Hash)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for DirectorySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, digest) in &self.entries {
            map.serialize_entry(key, &hex::encode(digest))?;
        }
        map.end()
    }
}

/// Snapshot and fingerprint of one root, computed from a single walk
#[derive(Debug, Clone)]
pub struct RootState {
    pub root: PathBuf,
    pub snapshot: DirectorySnapshot,
    pub fingerprint: Hash,
    /// Total bytes read while hashing files
    pub bytes_hashed: u64,
}

impl RootState {
    /// State of a root that no longer exists: no entries at all
    pub fn vanished(root: &Path) -> Self {
        let snapshot = DirectorySnapshot::new();
        Self {
            root: root.to_path_buf(),
            fingerprint: snapshot.fingerprint(),
            snapshot,
            bytes_hashed: 0,
        }
    }
}

/// Captures [`DirectorySnapshot`]s
#[derive(Debug, Clone, Default)]
pub struct Snapshotter {
    walker_config: WalkerConfig,
}

impl Snapshotter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom walker configuration (ignore names, depth limit)
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Capture the per-entry digest map for `root`
    pub fn snapshot(&self, root: &Path) -> Result<DirectorySnapshot, StorageError> {
        Ok(self.capture(root)?.snapshot)
    }

    /// Walk `root` once, hashing every file, and return the snapshot with its fingerprint
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn capture(&self, root: &Path) -> Result<RootState, StorageError> {
        let start = Instant::now();

        let walker = Walker::with_config(root.to_path_buf(), self.walker_config.clone());
        let entries = walker.walk()?;
        debug!(entry_count = entries.len(), "Walked directory");

        let mut snapshot = DirectorySnapshot::new();
        let mut bytes_hashed = 0u64;

        for entry in entries {
            match entry {
                Entry::File { path, size } => {
                    let key = path::relative_key(root, &path)?;
                    let digest = hasher::hash_file(&path)?;
                    trace!(key = %key, digest = %hex::encode(digest), "Hashed file");
                    bytes_hashed += size;
                    snapshot.insert(key, digest);
                }
                Entry::Directory { path } => {
                    let key = path::relative_key(root, &path)?;
                    snapshot.insert(path::directory_key(&key), DIRECTORY_MARKER);
                }
                Entry::Symlink { path, target } => {
                    let key = path::relative_key(root, &path)?;
                    snapshot.insert(key, hasher::hash_symlink_target(&target));
                }
            }
        }

        let fingerprint = snapshot.fingerprint();
        info!(
            entries = snapshot.len(),
            bytes = bytes_hashed,
            fingerprint = %hex::encode(fingerprint),
            duration_ms = start.elapsed().as_millis(),
            "Snapshot captured"
        );

        Ok(RootState {
            root: root.to_path_buf(),
            snapshot,
            fingerprint,
            bytes_hashed,
        })
    }
}

/// Capture a snapshot of `root` with the default walker configuration
pub fn snapshot(root: &Path) -> Result<DirectorySnapshot, StorageError> {
    Snapshotter::new().snapshot(root)
}
