//! # CLI Command Implementations
//!
//! Each subcommand of `gitlab-reconcile` lives in its own file with an `Args`
//! struct derived with `clap` and an `execute` function that calls into the
//! `gitlab_reconcile` library.
//!
//! [`TargetArgs`] holds the options shared by `sync` and `plan`: which group
//! to reconcile, where the checkouts live, and how to reach GitLab.

pub mod completions;
pub mod plan;
pub mod sync;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use gitlab_reconcile::config::{self, CloneProtocol, ConfigInput, Configuration, GitLabSettings};
use gitlab_reconcile::defaults;
use gitlab_reconcile::git::SystemGit;
use gitlab_reconcile::remote::GitLabClient;

/// Options that select the group and the directories to reconcile.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// GitLab group id or full path (e.g. `42` or `acme/backend`)
    #[arg(long, env = "GITLAB_GROUP_ID", value_name = "GROUP")]
    pub group_id: String,

    /// Root under which every managed directory lives [default: current directory]
    #[arg(long, env = "GITLAB_RECONCILE_BASE_DIR", value_name = "DIR")]
    pub base_directory: Option<PathBuf>,

    /// Directory holding the group's checkouts, relative to the base directory [default: base directory]
    #[arg(long, value_name = "DIR")]
    pub group_directory: Option<PathBuf>,

    /// Extra directory to delete if present (repeatable)
    #[arg(long = "include-directory", value_name = "DIR")]
    pub include_directories: Vec<PathBuf>,

    /// Hard-reset checkouts to the remote default branch (discards local commits)
    #[arg(short, long)]
    pub update: bool,

    /// Also delete `<base>/<username>` directories of group members
    #[arg(long)]
    pub member_directories: bool,

    /// Clone over SSH instead of HTTPS
    #[arg(long)]
    pub ssh: bool,

    /// GitLab instance URL
    #[arg(long, env = "GITLAB_URL", value_name = "URL", default_value = defaults::DEFAULT_API_URL)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = defaults::default_timeout().as_secs())]
    pub timeout: u64,

    /// Retries for transient API failures
    #[arg(long, value_name = "N", default_value_t = defaults::DEFAULT_MAX_RETRIES)]
    pub retries: u32,
}

impl TargetArgs {
    /// Validate the directory options into a [`Configuration`].
    pub fn configuration(&self, force: bool, dry_run: bool) -> Result<Configuration> {
        let cwd = env::current_dir().context("Failed to determine the current directory")?;
        let input = ConfigInput {
            group_id: self.group_id.clone(),
            base_directory: self.base_directory.clone(),
            group_directory: self.group_directory.clone(),
            include_directories: self.include_directories.clone(),
            force,
            dry_run,
            update: self.update,
            delete_member_directories: self.member_directories,
        };
        Ok(Configuration::resolve(input, &cwd)?)
    }

    /// GitLab API client built from the connection options and `GITLAB_TOKEN`.
    pub fn client(&self) -> Result<GitLabClient> {
        let token = config::token_from_env()?;
        let protocol = if self.ssh {
            CloneProtocol::Ssh
        } else {
            CloneProtocol::Https
        };
        let settings = GitLabSettings::new(&self.api_url, token)
            .with_context(|| format!("Invalid GitLab URL: {}", self.api_url))?
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_retries(self.retries)
            .with_clone_protocol(protocol);
        Ok(GitLabClient::new(settings)?)
    }

    pub fn git(&self) -> SystemGit {
        SystemGit::new(Duration::from_secs(self.timeout))
    }
}
