//! Change detection between two instants of the same roots
//!
//! Two signals are computed: a coarse per-root changed/unchanged flag from fingerprints, and
//! a detailed per-entry classification from snapshots. Both agree whenever both are computed:
//! a root is flagged by fingerprints exactly when its detailed diff is non-empty.

use crate::tree::snapshot::DirectorySnapshot;
use crate::types::Hash;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::Peekable;
use std::path::PathBuf;

/// How an entry differs between the pre and post snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ChangeKind {
    /// Present after, absent before
    Added,
    /// Present in both with different digests
    Modified,
    /// Present before, absent after
    Removed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Added => "Added",
            ChangeKind::Modified => "Modified",
            ChangeKind::Removed => "Removed",
        };
        f.write_str(label)
    }
}

/// One classified entry, relative to its root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub path: String,
}

impl ChangeRecord {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.path)
    }
}

/// Changed roots and their records. Unchanged roots are absent.
pub type ChangeSet = BTreeMap<PathBuf, Vec<ChangeRecord>>;

/// Roots whose fingerprint differs between `pre` and `post`.
///
/// A root missing from `post` is compared against the fingerprint of an empty snapshot, the
/// same way [`diff_snapshots`] treats it.
pub fn diff_fingerprints(
    pre: &BTreeMap<PathBuf, Hash>,
    post: &BTreeMap<PathBuf, Hash>,
) -> BTreeSet<PathBuf> {
    let empty = DirectorySnapshot::new().fingerprint();
    pre.iter()
        .filter(|(root, fingerprint)| post.get(*root).unwrap_or(&empty) != *fingerprint)
        .map(|(root, _)| root.clone())
        .collect()
}

/// Classify every entry that differs between two snapshots of one root, ordered by path
pub fn diff_snapshot(pre: &DirectorySnapshot, post: &DirectorySnapshot) -> Vec<ChangeRecord> {
    let mut records = Vec::new();
    let mut before = pre.iter().peekable();
    let mut after = post.iter().peekable();

    loop {
        let ordering = match (before.peek(), after.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((a, _)), Some((b, _))) => a.cmp(b),
        };

        match ordering {
            Ordering::Less => {
                let (key, _) = advance(&mut before);
                records.push(ChangeRecord::new(ChangeKind::Removed, key.clone()));
            }
            Ordering::Greater => {
                let (key, _) = advance(&mut after);
                records.push(ChangeRecord::new(ChangeKind::Added, key.clone()));
            }
            Ordering::Equal => {
                let (key, old) = advance(&mut before);
                let (_, new) = advance(&mut after);
                if old != new {
                    records.push(ChangeRecord::new(ChangeKind::Modified, key.clone()));
                }
            }
        }
    }

    records
}

fn advance<I: Iterator>(iter: &mut Peekable<I>) -> I::Item {
    // Only called after a successful peek
    match iter.next() {
        Some(item) => item,
        None => unreachable!("advance called on an exhausted iterator"),
    }
}

/// Detailed diff for every root in `pre`.
///
/// A root absent from `post` is compared against an empty snapshot, so all of its entries
/// are reported as removed. Roots with no differences are omitted.
pub fn diff_snapshots(
    pre: &BTreeMap<PathBuf, DirectorySnapshot>,
    post: &BTreeMap<PathBuf, DirectorySnapshot>,
) -> ChangeSet {
    let empty = DirectorySnapshot::new();
    pre.iter()
        .filter_map(|(root, before)| {
            let after = post.get(root).unwrap_or(&empty);
            let records = diff_snapshot(before, after);
            (!records.is_empty()).then(|| (root.clone(), records))
        })
        .collect()
}

/// Count records of each kind
pub fn tally(records: &[ChangeRecord]) -> BTreeMap<ChangeKind, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.kind).or_insert(0) += 1;
    }
    counts
}
