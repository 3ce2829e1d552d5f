//! # Reconciliation Planner
//!
//! Computes what must happen to make the group directory match the GitLab
//! group, without doing any of it.
//!
//! Given the remote and local catalogs (both keyed by repository name):
//!
//! 1. **Delete**: local checkouts whose name is not in the remote catalog,
//!    restricted to the group directory.
//! 2. **DeleteExtra**: each configured include directory (and, when enabled,
//!    each group member's directory) that exists on disk.
//! 3. **Clone**: remote repositories with no local checkout.
//! 4. **Update**: with `update` set, every repository present on both sides.
//! 5. **OriginMismatch**: a repository present on both sides whose local
//!    `origin` points somewhere else. Never updated or re-pointed
//!    automatically; it is reported so the operator can decide.
//!
//! Actions come out in that category order (deletions before clones, so a
//! clone never targets a path that is about to be vacated) and in name or
//! path order within a category.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::catalog::{same_repository, Catalog, RepositoryIdentity};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::local::DirectoryLister;
use crate::path::{is_strict_descendant, is_within, join_repo_name, normalize};

/// The category of an [`Action`], in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Delete,
    DeleteExtra,
    Clone,
    Update,
    OriginMismatch,
}

/// One planned change, carrying the absolute path it operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Remove a local checkout whose repository no longer exists remotely.
    Delete { name: String, path: PathBuf },
    /// Remove a directory requested explicitly (include directories, member
    /// directories), regardless of remote membership.
    DeleteExtra { path: PathBuf },
    /// Clone a remote repository that has no local checkout.
    Clone {
        identity: RepositoryIdentity,
        path: PathBuf,
    },
    /// Hard-update an existing checkout to the remote default branch tip.
    Update {
        name: String,
        path: PathBuf,
        branch: Option<String>,
    },
    /// Local checkout's origin does not match the remote clone URL.
    OriginMismatch {
        name: String,
        path: PathBuf,
        local_url: String,
        remote_url: String,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Delete { .. } => ActionKind::Delete,
            Action::DeleteExtra { .. } => ActionKind::DeleteExtra,
            Action::Clone { .. } => ActionKind::Clone,
            Action::Update { .. } => ActionKind::Update,
            Action::OriginMismatch { .. } => ActionKind::OriginMismatch,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Action::Delete { path, .. }
            | Action::DeleteExtra { path }
            | Action::Clone { path, .. }
            | Action::Update { path, .. }
            | Action::OriginMismatch { path, .. } => path,
        }
    }

    /// Repository name, for actions tied to a catalog entry.
    pub fn name(&self) -> Option<&str> {
        match self {
            Action::Delete { name, .. }
            | Action::Update { name, .. }
            | Action::OriginMismatch { name, .. } => Some(name),
            Action::Clone { identity, .. } => Some(&identity.name),
            Action::DeleteExtra { .. } => None,
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, Action::Delete { .. } | Action::DeleteExtra { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Delete { name, path } => {
                write!(f, "delete {} ({})", name, path.display())
            }
            Action::DeleteExtra { path } => write!(f, "delete extra {}", path.display()),
            Action::Clone { identity, path } => write!(
                f,
                "clone {} into {}",
                identity.remote_url.as_deref().unwrap_or(&identity.full_path),
                path.display()
            ),
            Action::Update { name, path, .. } => {
                write!(f, "update {} ({})", name, path.display())
            }
            Action::OriginMismatch {
                name,
                local_url,
                remote_url,
                ..
            } => write!(
                f,
                "origin mismatch for {}: local {} vs remote {}",
                name, local_url, remote_url
            ),
        }
    }
}

/// Ordered list of actions for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn of_kind(&self, kind: ActionKind) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(move |a| a.kind() == kind)
    }

    /// Names of the catalog-backed actions of one kind, in plan order.
    pub fn names(&self, kind: ActionKind) -> Vec<&str> {
        self.of_kind(kind).filter_map(Action::name).collect()
    }

    /// Every `Delete` and `DeleteExtra`, in plan order.
    pub fn deletions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.is_deletion())
    }
}

/// Builds a [`Plan`] from two catalogs.
pub struct Planner<'a> {
    config: &'a Configuration,
    lister: &'a dyn DirectoryLister,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a Configuration, lister: &'a dyn DirectoryLister) -> Self {
        Self { config, lister }
    }

    /// Compute the plan.
    ///
    /// `member_directories` are candidate extra deletions that, unlike
    /// configured include directories, are dropped with a warning instead of
    /// failing the run when they collide with managed paths.
    ///
    /// Fails with [`Error::Config`] when an include directory lies outside
    /// the base directory. An include directory holding a managed repository
    /// is still scheduled, with a warning naming the repository.
    pub fn plan(
        &self,
        remote: &Catalog,
        local: &Catalog,
        member_directories: &[PathBuf],
    ) -> Result<Plan> {
        let group_dir = self.config.group_directory();
        let base_dir = self.config.base_directory();
        let mut actions = Vec::new();

        let mut deleted: HashSet<PathBuf> = HashSet::new();
        for identity in local.iter().filter(|l| !remote.contains(&l.name)) {
            let path = join_repo_name(group_dir, &identity.name);
            if !is_strict_descendant(&path, group_dir) {
                warn!(
                    "Not deleting {}: outside group directory {}",
                    path.display(),
                    group_dir.display()
                );
                continue;
            }
            info!("Repository to delete: {} (not found on GitLab)", identity.name);
            deleted.insert(path.clone());
            actions.push(Action::Delete {
                name: identity.name.clone(),
                path,
            });
        }

        let managed: Vec<PathBuf> = remote
            .names()
            .map(|name| join_repo_name(group_dir, name))
            .collect();

        let mut extras = BTreeSet::new();
        for dir in self.config.include_directories() {
            let dir = normalize(dir);
            if !is_strict_descendant(&dir, base_dir) {
                return Err(Error::config(format!(
                    "include directory {} is outside base directory {}",
                    dir.display(),
                    base_dir.display()
                )));
            }
            for repo in managed.iter().filter(|repo| is_within(repo, &dir)) {
                warn!(
                    "Include directory {} contains managed repository {}; it will be deleted too",
                    dir.display(),
                    repo.display()
                );
            }
            if deleted.contains(&dir) {
                debug!("{} is already scheduled for deletion", dir.display());
                continue;
            }
            if !self.lister.exists(&dir) {
                debug!("Include directory {} does not exist", dir.display());
                continue;
            }
            extras.insert(dir);
        }

        for dir in member_directories {
            let dir = normalize(dir);
            if !is_strict_descendant(&dir, base_dir)
                || is_within(group_dir, &dir)
                || managed.iter().any(|repo| is_within(repo, &dir))
            {
                warn!(
                    "Not deleting member directory {}: it overlaps managed repositories",
                    dir.display()
                );
                continue;
            }
            if deleted.contains(&dir) || !self.lister.is_dir(&dir) {
                continue;
            }
            extras.insert(dir);
        }

        for path in extras {
            info!("Extra directory to delete: {}", path.display());
            actions.push(Action::DeleteExtra { path });
        }

        for identity in remote.iter().filter(|r| !local.contains(&r.name)) {
            info!("Repository to clone: {}", identity.name);
            actions.push(Action::Clone {
                path: join_repo_name(group_dir, &identity.name),
                identity: identity.clone(),
            });
        }

        let mut mismatches = Vec::new();
        for remote_identity in remote.iter() {
            let Some(local_identity) = local.get(&remote_identity.name) else {
                continue;
            };
            let path = join_repo_name(group_dir, &remote_identity.name);
            if let (Some(local_url), Some(remote_url)) =
                (&local_identity.remote_url, &remote_identity.remote_url)
            {
                if !same_repository(local_url, remote_url) {
                    warn!(
                        "Origin of {} is {}, GitLab reports {}",
                        remote_identity.name, local_url, remote_url
                    );
                    mismatches.push(Action::OriginMismatch {
                        name: remote_identity.name.clone(),
                        path,
                        local_url: local_url.clone(),
                        remote_url: remote_url.clone(),
                    });
                    continue;
                }
            }
            if self.config.update() {
                debug!("Repository to update: {}", remote_identity.name);
                actions.push(Action::Update {
                    name: remote_identity.name.clone(),
                    path,
                    branch: remote_identity.default_branch.clone(),
                });
            }
        }
        actions.extend(mismatches);

        Ok(Plan { actions })
    }
}
