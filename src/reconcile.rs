//! End-to-end reconciliation run: scan, list, plan, execute.
//!
//! The local scan runs before any network request, so a missing group
//! directory is reported without contacting GitLab.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::Configuration;
use crate::error::Result;
use crate::executor::{Confirmer, DirectoryRemover, Executor, Report};
use crate::git::GitClient;
use crate::local::{self, DirectoryLister};
use crate::path::{is_safe_repo_name, join_repo_name};
use crate::planner::{Plan, Planner};
use crate::remote::{self, GroupRepositoryLister};

/// The collaborators a run needs.
pub struct Reconciler<'a> {
    config: &'a Configuration,
    remote: &'a dyn GroupRepositoryLister,
    lister: &'a dyn DirectoryLister,
    git: &'a dyn GitClient,
    remover: &'a dyn DirectoryRemover,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a Configuration,
        remote: &'a dyn GroupRepositoryLister,
        lister: &'a dyn DirectoryLister,
        git: &'a dyn GitClient,
        remover: &'a dyn DirectoryRemover,
    ) -> Self {
        Self {
            config,
            remote,
            lister,
            git,
            remover,
        }
    }

    /// Build both catalogs and compute the plan without changing anything.
    pub fn plan(&self) -> Result<Plan> {
        let mut local = local::scan(self.config.group_directory(), self.lister)?;
        info!(
            "Found {} local repositories in {}",
            local.len(),
            self.config.group_directory().display()
        );
        let remote = remote::remote_catalog(self.remote, self.config.group_id())?;
        self.attach_origins(&mut local);
        let members = self.member_directories()?;

        Planner::new(self.config, self.lister).plan(&remote, &local, &members)
    }

    /// Plan and execute. Only errors raised before execution starts are
    /// returned as `Err`; per-action failures are in the [`Report`].
    pub fn run(&self, confirmer: &mut dyn Confirmer) -> Result<(Plan, Report)> {
        let plan = self.plan()?;
        if plan.is_empty() {
            info!("Nothing to do: local checkouts match the group");
        }
        let report = Executor::new(self.config, self.git, self.remover).execute(&plan, confirmer);
        Ok((plan, report))
    }

    fn attach_origins(&self, local: &mut Catalog) {
        let names: Vec<String> = local.names().map(str::to_string).collect();
        for name in names {
            if let Some(identity) = local.get_mut(&name) {
                let path = PathBuf::from(&identity.full_path);
                match self.git.origin_url(&path) {
                    Ok(url) => identity.remote_url = url,
                    Err(e) => debug!("Cannot read origin of {}: {}", path.display(), e),
                }
            }
        }
    }

    fn member_directories(&self) -> Result<Vec<PathBuf>> {
        if !self.config.delete_member_directories() {
            return Ok(Vec::new());
        }
        let usernames = self.remote.list_group_members(self.config.group_id())?;
        let mut dirs = Vec::new();
        for username in usernames {
            if !is_safe_repo_name(&username) || username.contains('/') {
                warn!("Ignoring member with unusable username '{}'", username);
                continue;
            }
            dirs.push(join_repo_name(self.config.base_directory(), &username));
        }
        Ok(dirs)
    }
}
