//! # Local Catalog
//!
//! Finds the Git checkouts below the group directory. A directory counts as
//! a checkout iff its entries include `.git` (a directory for normal clones,
//! a file for worktrees and submodule-style checkouts); see
//! [`is_git_checkout`].
//!
//! Directory listing goes through the [`DirectoryLister`] trait so the scan
//! and the predicate can be exercised without touching the disk.
//! [`FsDirectoryLister`] is the real implementation.
//!
//! Directories that are not checkouts are descended into (up to
//! [`MAX_SCAN_DEPTH`](crate::defaults::MAX_SCAN_DEPTH) levels) so subgroup
//! layouts such as `backend/api` are found. Descent stops at a checkout, and
//! hidden entries and symlinks are never followed.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::catalog::{Catalog, RepositoryIdentity};
use crate::defaults;
use crate::error::{Error, Result};

/// A single entry directly inside a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    /// True for real directories; symlinks report `false`.
    pub is_dir: bool,
}

impl DirEntryInfo {
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }
}

/// Read-only view of the directory tree. Allows mocking in tests.
pub trait DirectoryLister {
    /// Entries directly inside `dir`.
    fn entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;
}

/// [`DirectoryLister`] over the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirectoryLister;

impl DirectoryLister for FsDirectoryLister {
    fn entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }
}

/// True when a directory with these entries is a Git checkout.
pub fn is_git_checkout(entries: &[DirEntryInfo]) -> bool {
    entries.iter().any(|entry| entry.name == ".git")
}

/// Scan `root` for Git checkouts.
///
/// Fails with [`Error::Path`] when `root` is missing or not a directory.
/// Unreadable subdirectories are skipped with a warning.
pub fn scan(root: &Path, lister: &dyn DirectoryLister) -> Result<Catalog> {
    if !lister.is_dir(root) {
        let message = if lister.exists(root) {
            "not a directory"
        } else {
            "does not exist"
        };
        return Err(Error::Path {
            path: root.to_path_buf(),
            message: message.to_string(),
        });
    }

    let top = lister.entries(root).map_err(|e| Error::Path {
        path: root.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut catalog = Catalog::new();
    let mut pending: Vec<(PathBuf, String, usize)> = child_dirs(&top)
        .map(|name| (root.join(&name), name, 1))
        .collect();

    while let Some((dir, name, depth)) = pending.pop() {
        let entries = match lister.entries(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        if is_git_checkout(&entries) {
            debug!("Found local repository {}", name);
            catalog.insert(RepositoryIdentity::local(
                name,
                dir.to_string_lossy().into_owned(),
            ));
        } else if depth < defaults::MAX_SCAN_DEPTH {
            for child in child_dirs(&entries) {
                pending.push((dir.join(&child), format!("{}/{}", name, child), depth + 1));
            }
        }
    }

    Ok(catalog)
}

fn child_dirs(entries: &[DirEntryInfo]) -> impl Iterator<Item = String> + '_ {
    entries
        .iter()
        .filter(|entry| entry.is_dir && !entry.name.starts_with('.'))
        .map(|entry| entry.name.clone())
}
