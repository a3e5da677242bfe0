//! Overlays: disposable writable copies of host directories
//!
//! [`OverlayManager::prepare`] copies each editable root into a fresh temporary directory and
//! hands back an [`OverlaySet`] guard. The guard owns every overlay it holds: explicit
//! [`OverlaySet::cleanup`] removes them and reports failures, and dropping the guard without
//! calling it (panic, early return) removes whatever is left.

use crate::error::{CleanupError, OverlayError};
use crate::tree::path::root_label;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

/// An original root and the working copy that stands in for it during a session
#[derive(Debug)]
pub struct OverlayBinding {
    original: PathBuf,
    overlay: PathBuf,
    dir: Option<TempDir>,
}

impl OverlayBinding {
    /// Host directory the overlay was copied from
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Path of the working copy
    pub fn overlay(&self) -> &Path {
        &self.overlay
    }

    fn release(&mut self) -> Result<bool, CleanupError> {
        match self.dir.take() {
            Some(dir) => {
                make_removable(dir.path());
                match dir.close() {
                    Ok(()) => Ok(true),
                    // Something inside the sandbox already deleted it
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
                    Err(e) => Err(CleanupError {
                        overlay: self.overlay.clone(),
                        source: e,
                    }),
                }
            }
            None => Ok(false),
        }
    }
}

/// Outcome of [`OverlaySet::cleanup`]
#[derive(Debug, Default)]
pub struct CleanupSummary {
    pub removed: usize,
    pub failed: Vec<CleanupError>,
}

impl CleanupSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Guard over every overlay created for one session
#[derive(Debug, Default)]
pub struct OverlaySet {
    bindings: Vec<OverlayBinding>,
}

impl OverlaySet {
    pub fn bindings(&self) -> &[OverlayBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Overlay path for an original root, if one was prepared
    pub fn overlay_for(&self, original: &Path) -> Option<&Path> {
        self.bindings
            .iter()
            .find(|b| b.original == original)
            .map(|b| b.overlay.as_path())
    }

    /// Remove every overlay. Removal failures are logged and collected, never raised.
    pub fn cleanup(mut self) -> CleanupSummary {
        self.release_all()
    }

    fn release_all(&mut self) -> CleanupSummary {
        let mut summary = CleanupSummary::default();
        for binding in self.bindings.iter_mut() {
            match binding.release() {
                Ok(true) => {
                    debug!(overlay = %binding.overlay.display(), "Removed overlay");
                    summary.removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(overlay = %binding.overlay.display(), "Overlay removal failed: {}", e);
                    summary.failed.push(e);
                }
            }
        }
        self.bindings.clear();
        summary
    }
}

impl Drop for OverlaySet {
    fn drop(&mut self) {
        if !self.bindings.is_empty() {
            let summary = self.release_all();
            debug!(removed = summary.removed, "Released overlays on drop");
        }
    }
}

/// Creates overlays under a temporary root
#[derive(Debug, Clone, Default)]
pub struct OverlayManager {
    temp_root: Option<PathBuf>,
}

impl OverlayManager {
    /// Overlays go in the system temp directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays go under `temp_root` (or the system temp directory when `None`)
    pub fn with_temp_root(temp_root: Option<PathBuf>) -> Self {
        Self { temp_root }
    }

    /// Copy every root into its own fresh overlay.
    ///
    /// If any copy fails, overlays already created in this batch are removed before the error
    /// is returned.
    #[instrument(skip(self, roots), fields(roots = roots.len()))]
    pub fn prepare(&self, roots: &[PathBuf]) -> Result<OverlaySet, OverlayError> {
        let start = Instant::now();
        let mut set = OverlaySet::default();

        for root in roots {
            match self.prepare_one(root) {
                Ok(binding) => set.bindings.push(binding),
                Err(e) => {
                    error!(root = %root.display(), "Overlay preparation failed: {}", e);
                    let summary = set.cleanup();
                    debug!(removed = summary.removed, "Rolled back partial overlay batch");
                    return Err(e);
                }
            }
        }

        info!(
            overlays = set.len(),
            duration_ms = start.elapsed().as_millis(),
            "Overlays prepared"
        );
        Ok(set)
    }

    fn prepare_one(&self, root: &Path) -> Result<OverlayBinding, OverlayError> {
        let prefix = format!("{}_overlay_", root_label(root));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.temp_root {
            Some(temp_root) => builder.tempdir_in(temp_root),
            None => builder.tempdir(),
        }
        .map_err(|e| OverlayError::Create {
            root: root.to_path_buf(),
            source: e,
        })?;

        let overlay = dir.path().to_path_buf();
        // Owned by the binding from here on, so a failed copy still removes the directory
        let binding = OverlayBinding {
            original: root.to_path_buf(),
            overlay: overlay.clone(),
            dir: Some(dir),
        };

        copy_tree(root, &overlay)?;
        debug!(root = %root.display(), overlay = %overlay.display(), "Copied root into overlay");
        Ok(binding)
    }
}

/// Recursively copy `src` into the existing directory `dst`, keeping permission bits and
/// recreating symlinks as links.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), OverlayError> {
    let copy_err = |path: &Path, e: std::io::Error| OverlayError::Copy {
        root: src.to_path_buf(),
        path: path.to_path_buf(),
        source: e,
    };

    // Directory permissions are applied last, deepest first, so read-only directories can
    // still be populated.
    let mut dir_permissions = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| OverlayError::Walk {
            root: src.to_path_buf(),
            message: e.to_string(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| OverlayError::Walk {
                root: src.to_path_buf(),
                message: e.to_string(),
            })?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if entry.depth() > 0 {
                fs::create_dir(&target).map_err(|e| copy_err(entry.path(), e))?;
            }
            let metadata = entry.metadata().map_err(|e| OverlayError::Walk {
                root: src.to_path_buf(),
                message: e.to_string(),
            })?;
            dir_permissions.push((target, metadata.permissions()));
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(|e| copy_err(entry.path(), e))?;
            create_symlink(&link, &target).map_err(|e| copy_err(entry.path(), e))?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target).map_err(|e| copy_err(entry.path(), e))?;
        } else {
            debug!(path = %entry.path().display(), "Skipping special file during copy");
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(&dir, permissions).map_err(|e| copy_err(&dir, e))?;
    }

    Ok(())
}

/// Give the owner write access to every directory under `root` so its entries can be
/// unlinked. Copied read-only directories would otherwise survive removal.
#[cfg(unix)]
fn make_removable(root: &Path) {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(root).follow_links(false).into_iter().flatten() {
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            let mode = metadata.permissions().mode();
            if mode & 0o300 != 0o300 {
                let _ = fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode | 0o300));
            }
        }
    }
}

#[cfg(not(unix))]
fn make_removable(root: &Path) {
    for entry in WalkDir::new(root).follow_links(false).into_iter().flatten() {
        if let Ok(metadata) = entry.metadata() {
            let mut permissions = metadata.permissions();
            if permissions.readonly() {
                #[allow(clippy::permissions_set_readonly_false)]
                permissions.set_readonly(false);
                let _ = fs::set_permissions(entry.path(), permissions);
            }
        }
    }
}

#[cfg(unix)]
fn create_symlink(link: &Path, at: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, at)
}

#[cfg(windows)]
fn create_symlink(link: &Path, at: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(link, at)
}
