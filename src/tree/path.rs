//! Path canonicalization and snapshot key utilities

use crate::error::StorageError;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Canonicalize a path (resolves symlinks, `..`, `.`) without UNC prefixes on Windows
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, StorageError> {
    dunce::canonicalize(path)
        .map_err(|e| StorageError::InvalidPath(format!("Failed to canonicalize {:?}: {}", path, e)))
}

/// Build the snapshot key for `path` relative to `root`.
///
/// Keys are `/`-separated regardless of platform so snapshots taken on different hosts
/// compare equal. Names are escaped with [`push_name`], so distinct names always map to
/// distinct keys.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, StorageError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        StorageError::InvalidPath(format!("{:?} is not under {:?}", path, root))
    })?;

    let mut key = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                if !key.is_empty() {
                    key.push('/');
                }
                push_name(&mut key, name);
            }
            Component::CurDir => {}
            other => {
                return Err(StorageError::InvalidPath(format!(
                    "Unexpected component {:?} in {:?}",
                    other, relative
                )))
            }
        }
    }

    if key.is_empty() {
        return Err(StorageError::InvalidPath(format!(
            "{:?} is the root itself, not an entry under it",
            path
        )));
    }
    Ok(key)
}

/// Append one path component to `key`.
///
/// UTF-8 text is copied through except `\`, which becomes `\\`. Bytes that are not valid
/// UTF-8 become `\xNN`. The mapping is injective, so two names that differ on disk never
/// share a key.
pub fn push_name(key: &mut String, name: &OsStr) {
    let mut bytes = name.as_encoded_bytes();
    while !bytes.is_empty() {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                push_text(key, text);
                break;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix decodes
                if let Ok(text) = std::str::from_utf8(valid) {
                    push_text(key, text);
                }
                let invalid = e.error_len().unwrap_or(rest.len());
                for byte in &rest[..invalid] {
                    key.push_str(&format!("\\x{:02x}", byte));
                }
                bytes = &rest[invalid..];
            }
        }
    }
}

fn push_text(key: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '\\' {
            key.push_str("\\\\");
        } else {
            key.push(ch);
        }
    }
}

/// Directory keys carry a trailing slash so a directory never shares a key with a file
pub fn directory_key(key: &str) -> String {
    format!("{}/", key)
}

/// File name of a root, used to label overlays. Falls back to "root" for `/`.
pub fn root_label(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().replace(['/', '\\'], "_"))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "root".to_string())
}
