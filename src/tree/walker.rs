//! Filesystem walker for traversing directory structures
//!
//! Symbolic links are never followed. They are reported as [`Entry::Symlink`] with their
//! target so callers can record them as links.

use crate::error::StorageError;
use std::path::PathBuf;
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A regular file with its path and size
    File { path: PathBuf, size: u64 },
    /// A directory
    Directory { path: PathBuf },
    /// A symbolic link and the target it points at (not resolved)
    Symlink { path: PathBuf, target: PathBuf },
}

impl Entry {
    pub fn path(&self) -> &PathBuf {
        match self {
            Entry::File { path, .. } | Entry::Directory { path } | Entry::Symlink { path, .. } => {
                path
            }
        }
    }
}

/// Filesystem walker configuration
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Entry names to skip entirely, matched against single path components
    pub ignore_names: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the filesystem and collect all entries below the root.
    ///
    /// Returns entries sorted by path for determinism. The root itself is not included.
    pub fn walk(&self) -> Result<Vec<Entry>, StorageError> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_ignore(e));

        for entry in walker {
            let entry = entry.map_err(|e| StorageError::Walk {
                root: self.root.clone(),
                message: e.to_string(),
            })?;

            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path().to_path_buf();
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                let target = std::fs::read_link(&path).map_err(|e| StorageError::Read {
                    path: path.clone(),
                    source: e,
                })?;
                entries.push(Entry::Symlink { path, target });
            } else if file_type.is_dir() {
                entries.push(Entry::Directory { path });
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(|e| StorageError::Walk {
                    root: self.root.clone(),
                    message: format!("Failed to read metadata for {:?}: {}", path, e),
                })?;
                entries.push(Entry::File {
                    path,
                    size: metadata.len(),
                });
            } else {
                tracing::debug!(path = %path.display(), "Skipping special file");
            }
        }

        entries.sort_by(|a, b| a.path().cmp(b.path()));

        Ok(entries)
    }

    fn should_ignore(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.config
            .ignore_names
            .iter()
            .any(|pattern| pattern.as_str() == name)
    }
}
