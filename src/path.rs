//! Path manipulation utilities for gitlab-reconcile
//!
//! Everything here is lexical: no function touches the filesystem. The
//! executor pairs these checks with canonicalised paths right before it
//! removes anything.

use std::path::{Component, Path, PathBuf};

/// Lexically normalise a path: drop `.` components and fold `..` into the
/// preceding component.
///
/// A `..` that would climb above the root (or above the start of a relative
/// path) is kept, so the result never silently widens in scope.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolve `path` against `base` when relative, then normalise.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// True when `path` equals `ancestor` or lies below it.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    normalize(path).starts_with(normalize(ancestor))
}

/// True when `path` lies strictly below `ancestor`.
pub fn is_strict_descendant(path: &Path, ancestor: &Path) -> bool {
    let path = normalize(path);
    let ancestor = normalize(ancestor);
    path != ancestor && path.starts_with(&ancestor)
}

/// Check that a repository name can safely be joined onto a directory.
///
/// Names are `/`-separated relative paths (`api` or `backend/api`). Empty
/// segments, `.`/`..` segments, backslashes and leading `/` are rejected.
pub fn is_safe_repo_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('/') || name.contains('\\') {
        return false;
    }
    name.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Join a `/`-separated repository name onto a directory.
pub fn join_repo_name(dir: &Path, name: &str) -> PathBuf {
    name.split('/').fold(dir.to_path_buf(), |acc, seg| acc.join(seg))
}
