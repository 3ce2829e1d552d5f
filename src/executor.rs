//! # Action Executor
//!
//! Applies a [`Plan`] one action at a time, in plan order, and records an
//! [`ExecutionOutcome`] for every action. One failing action never stops the
//! rest of the batch; the caller decides the exit status from
//! [`Report::has_failures`].
//!
//! Guards, in the order they apply:
//!
//! - **Dry run** is checked once, before anything else. Every action is
//!   reported as `Skipped` and no collaborator is called.
//! - **Confirmation**: unless `force` is set, all pending deletions are shown
//!   to the [`Confirmer`] once, as a batch. Declining turns every deletion
//!   into `Skipped` (not `Failed`); clones and updates still run.
//! - **Scope**: a deletion target is resolved to its canonical path and must
//!   lie strictly inside the canonical base directory, or it fails with a
//!   permission error and nothing is removed.
//! - **Kept parents**: a clone whose target lies inside a deletion that was
//!   declined or did not succeed is `Skipped`, so it never lands inside a
//!   directory that was meant to go away.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::git::GitClient;
use crate::path::{is_strict_descendant, is_within};
use crate::planner::{Action, Plan};

const ALREADY_ABSENT: &str = "already absent";

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Not attempted; the string says why.
    Skipped(String),
    /// Attempted and failed; the string is the error.
    Failed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "ok"),
            Status::Skipped(reason) => write!(f, "skipped: {}", reason),
            Status::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// An action paired with what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub action: Action,
    pub status: Status,
}

/// Every outcome of a run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    outcomes: Vec<ExecutionOutcome>,
}

impl Report {
    pub fn outcomes(&self) -> &[ExecutionOutcome] {
        &self.outcomes
    }

    fn record(&mut self, action: &Action, status: Status) {
        self.outcomes.push(ExecutionOutcome {
            action: action.clone(),
            status,
        });
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, Status::Success))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, Status::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, Status::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Status) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Asks the operator whether the listed directories may be deleted.
pub trait Confirmer {
    fn confirm_deletions(&mut self, paths: &[PathBuf]) -> bool;
}

/// Filesystem side of deletions. Allows mocking in tests.
pub trait DirectoryRemover {
    /// Canonical form of `path`, or `None` when nothing exists there.
    fn locate(&self, path: &Path) -> io::Result<Option<PathBuf>>;

    /// Recursively remove `path`. A symlink is removed, not followed.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`DirectoryRemover`] over the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl DirectoryRemover for FsRemover {
    fn locate(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        match fs::symlink_metadata(path) {
            Ok(_) => fs::canonicalize(path).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let metadata = fs::symlink_metadata(path)?;
        if metadata.file_type().is_symlink() || metadata.is_file() {
            fs::remove_file(path)
        } else {
            fs::remove_dir_all(path)
        }
    }
}

/// Applies plans against git and the filesystem.
pub struct Executor<'a> {
    config: &'a Configuration,
    git: &'a dyn GitClient,
    remover: &'a dyn DirectoryRemover,
}

impl<'a> Executor<'a> {
    pub fn new(
        config: &'a Configuration,
        git: &'a dyn GitClient,
        remover: &'a dyn DirectoryRemover,
    ) -> Self {
        Self {
            config,
            git,
            remover,
        }
    }

    /// Run every action in `plan` and report the outcomes.
    pub fn execute(&self, plan: &Plan, confirmer: &mut dyn Confirmer) -> Report {
        let mut report = Report::default();

        if self.config.dry_run() {
            for action in plan.actions() {
                info!("[Dry Run] Would {}", action);
                report.record(action, Status::Skipped("dry run".to_string()));
            }
            return report;
        }

        let pending: Vec<PathBuf> = plan.deletions().map(|a| a.path().to_path_buf()).collect();
        let deletions_approved = if pending.is_empty() || self.config.force() {
            true
        } else {
            confirmer.confirm_deletions(&pending)
        };
        if !deletions_approved {
            info!("No directories were deleted.");
        }

        let mut kept: Vec<&Path> = Vec::new();
        for action in plan.actions() {
            let status = match action {
                Action::Delete { path, .. } | Action::DeleteExtra { path } => {
                    let status = if deletions_approved {
                        self.delete(path)
                    } else {
                        Status::Skipped("deletion declined".to_string())
                    };
                    if !is_gone(&status) {
                        kept.push(path);
                    }
                    status
                }
                Action::Clone { path, .. } if kept.iter().any(|dir| is_within(path, dir)) => {
                    Status::Skipped("parent directory scheduled for deletion was kept".to_string())
                }
                Action::Clone { identity, path } => match &identity.remote_url {
                    Some(url) => to_status(self.git.clone_repository(url, path)),
                    None => Status::Failed(format!("{} has no clone URL", identity.name)),
                },
                Action::Update { path, branch, .. } => {
                    to_status(self.git.update_repository(path, branch.as_deref()))
                }
                Action::OriginMismatch { .. } => Status::Skipped(
                    "origin differs from GitLab; re-point or remove the checkout manually"
                        .to_string(),
                ),
            };

            match &status {
                Status::Success => info!("Done: {}", action),
                Status::Skipped(reason) => warn!("Skipped: {} ({})", action, reason),
                Status::Failed(reason) => error!("Failed: {}: {}", action, reason),
            }
            report.record(action, status);
        }

        report
    }

    fn delete(&self, path: &Path) -> Status {
        let refuse = |message: String| {
            Status::Failed(
                Error::Permission {
                    path: path.to_path_buf(),
                    message,
                }
                .to_string(),
            )
        };

        let base = match self.remover.locate(self.config.base_directory()) {
            Ok(Some(base)) => base,
            Ok(None) => return refuse("base directory no longer exists".to_string()),
            Err(e) => return refuse(e.to_string()),
        };
        let target = match self.remover.locate(path) {
            Ok(Some(target)) => target,
            Ok(None) => return Status::Skipped(ALREADY_ABSENT.to_string()),
            Err(e) => return refuse(e.to_string()),
        };
        if !is_strict_descendant(&target, &base) {
            return refuse(format!(
                "resolves to {}, outside base directory {}",
                target.display(),
                base.display()
            ));
        }

        match self.remover.remove_dir_all(path) {
            Ok(()) => Status::Success,
            Err(e) => refuse(e.to_string()),
        }
    }
}

/// Whether a deletion left nothing behind at its path.
fn is_gone(status: &Status) -> bool {
    match status {
        Status::Success => true,
        Status::Skipped(reason) => reason == ALREADY_ABSENT,
        Status::Failed(_) => false,
    }
}

fn to_status(result: crate::error::Result<()>) -> Status {
    match result {
        Ok(()) => Status::Success,
        Err(e) => Status::Failed(e.to_string()),
    }
}
