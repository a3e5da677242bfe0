//! Property-based tests for determinism guarantees

use cordon::diff::{diff_snapshot, diff_snapshots, ChangeKind};
use cordon::tree::hasher;
use cordon::tree::snapshot::snapshot;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Files keyed by relative path. Directory components start with `d`, file names with `f`,
/// so a path is never both a file and a directory.
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        "(d[0-2]/){0,2}f[a-c]",
        prop::collection::vec(any::<u8>(), 0..48),
        0..12,
    )
}

fn materialize<'a>(root: &Path, files: impl Iterator<Item = (&'a String, &'a Vec<u8>)>) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Content hash is a pure function of the bytes
    #[test]
    fn content_hash_deterministic(content in any::<Vec<u8>>()) {
        prop_assert_eq!(
            hasher::compute_content_hash(&content),
            hasher::compute_content_hash(&content.clone())
        );
    }

    /// Fingerprint does not depend on the order entries were created in
    #[test]
    fn fingerprint_independent_of_creation_order(files in tree_strategy()) {
        let forward = TempDir::new().unwrap();
        let backward = TempDir::new().unwrap();
        materialize(forward.path(), files.iter());
        materialize(backward.path(), files.iter().rev());

        prop_assert_eq!(
            hasher::fingerprint(forward.path()).unwrap(),
            hasher::fingerprint(backward.path()).unwrap()
        );
    }

    /// The fingerprint comparison and the detailed diff always agree
    #[test]
    fn fingerprint_and_detailed_diff_agree(
        before in tree_strategy(),
        after in tree_strategy(),
    ) {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        materialize(a.path(), before.iter());
        materialize(b.path(), after.iter());

        let pre = snapshot(a.path()).unwrap();
        let post = snapshot(b.path()).unwrap();
        let records = diff_snapshot(&pre, &post);

        prop_assert_eq!(pre.fingerprint() == post.fingerprint(), records.is_empty());

        // Every file-level difference between the inputs shows up with the right kind
        let has = |kind: ChangeKind, rel: &String| {
            records.iter().any(|r| r.kind == kind && &r.path == rel)
        };
        for (rel, content) in &after {
            match before.get(rel) {
                None => prop_assert!(has(ChangeKind::Added, rel)),
                Some(old) if old != content => prop_assert!(has(ChangeKind::Modified, rel)),
                Some(_) => prop_assert!(records.iter().all(|r| &r.path != rel)),
            }
        }
        for rel in before.keys().filter(|k| !after.contains_key(*k)) {
            prop_assert!(has(ChangeKind::Removed, rel));
        }

        // Multi-root diff omits the root exactly when nothing changed
        let mut pre_roots = BTreeMap::new();
        let mut post_roots = BTreeMap::new();
        pre_roots.insert(PathBuf::from("/root"), pre);
        post_roots.insert(PathBuf::from("/root"), post);
        let changes = diff_snapshots(&pre_roots, &post_roots);
        prop_assert_eq!(changes.is_empty(), records.is_empty());
    }
}
