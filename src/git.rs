//! Git operations through the system `git` binary.
//!
//! Using the CLI rather than a library means every credential mechanism the
//! user already has configured applies unchanged:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig
//!
//! All commands run with `GIT_TERMINAL_PROMPT=0`, so a missing credential
//! fails the command instead of blocking on a prompt, and with HTTP
//! low-speed limits so a stalled HTTP transfer ends. The low-speed limits do
//! not apply to SSH remotes; a stalled SSH transfer is bounded only by the
//! user's own SSH settings (for example `ServerAliveInterval`).

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration;

use log::debug;

use crate::defaults;
use crate::error::{Error, Result};

/// Trait for git operations - allows mocking in tests
pub trait GitClient {
    /// Clone `url` into `target`. Parent directories are created; an
    /// existing `target` is never removed.
    fn clone_repository(&self, url: &str, target: &Path) -> Result<()>;

    /// Hard-update the checkout at `path` to the tip of the remote's default
    /// branch (`branch` when known).
    fn update_repository(&self, path: &Path, branch: Option<&str>) -> Result<()>;

    /// The checkout's `remote.origin.url`, if configured.
    fn origin_url(&self, path: &Path) -> Result<Option<String>>;
}

/// [`GitClient`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct SystemGit {
    stall_timeout: Duration,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new(defaults::default_timeout())
    }
}

impl SystemGit {
    /// `stall_timeout` bounds how long a transfer may run below 1 KiB/s.
    pub fn new(stall_timeout: Duration) -> Self {
        Self { stall_timeout }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_HTTP_LOW_SPEED_LIMIT", "1000")
            .env(
                "GIT_HTTP_LOW_SPEED_TIME",
                self.stall_timeout.as_secs().max(1).to_string(),
            );
        cmd
    }

    /// Run `git -C path <args>` and return stdout, or a `GitOperation` error.
    fn run_in(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = self.output_in(path, args)?;
        if !output.status.success() {
            return Err(Error::GitOperation {
                path: path.to_path_buf(),
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn output_in(&self, path: &Path, args: &[&str]) -> Result<Output> {
        debug!("git -C {} {}", path.display(), args.join(" "));
        self.command()
            .arg("-C")
            .arg(path)
            .args(args)
            .output()
            .map_err(|e| Error::GitOperation {
                path: path.to_path_buf(),
                command: args.join(" "),
                message: e.to_string(),
            })
    }

    /// Branch the checkout should track: `branch`, else `origin/HEAD`, else
    /// the current branch.
    fn target_branch(&self, path: &Path, branch: Option<&str>, current: &str) -> String {
        if let Some(branch) = branch {
            return branch.to_string();
        }
        match self.run_in(path, &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"]) {
            Ok(remote_head) => remote_head
                .strip_prefix("origin/")
                .unwrap_or(&remote_head)
                .to_string(),
            Err(_) => current.to_string(),
        }
    }
}

impl GitClient for SystemGit {
    fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Clone {
                url: url.to_string(),
                path: target.to_path_buf(),
                message: format!("cannot create parent directory: {}", e),
            })?;
        }

        debug!("git clone {} {}", url, target.display());
        let output = self
            .command()
            .args(["clone", "--", url])
            .arg(target)
            .output()
            .map_err(|e| Error::Clone {
                url: url.to_string(),
                path: target.to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            // Provide helpful error message for common auth failures
            let message = if stderr.contains("Authentication failed")
                || stderr.contains("Permission denied")
                || stderr.contains("Could not read from remote repository")
                || stderr.contains("terminal prompts disabled")
            {
                format!(
                    "Authentication failed. Make sure you have access to the repository \
                     (SSH key in ssh-agent, credential helper, or access token).\nError: {}",
                    stderr.trim()
                )
            } else {
                stderr.trim().to_string()
            };

            return Err(Error::Clone {
                url: url.to_string(),
                path: target.to_path_buf(),
                message,
            });
        }

        Ok(())
    }

    fn update_repository(&self, path: &Path, branch: Option<&str>) -> Result<()> {
        self.run_in(path, &["fetch", "--prune", "origin"])?;

        let current = self
            .run_in(path, &["symbolic-ref", "--quiet", "--short", "HEAD"])
            .map_err(|_| Error::GitOperation {
                path: path.to_path_buf(),
                command: "symbolic-ref HEAD".to_string(),
                message: "HEAD is detached; check out a branch first".to_string(),
            })?;

        let target = self.target_branch(path, branch, &current);
        let upstream = format!("origin/{}", target);
        if target != current {
            // `-B` names the branch and its start point, never a pathspec.
            self.run_in(path, &["checkout", "-B", &target, &upstream])?;
        }
        self.run_in(path, &["reset", "--hard", &upstream])?;
        Ok(())
    }

    fn origin_url(&self, path: &Path) -> Result<Option<String>> {
        let output = self.output_in(path, &["config", "--get", "remote.origin.url"])?;
        if !output.status.success() {
            // `git config --get` exits 1 when the key is unset.
            return Ok(None);
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if url.is_empty() { None } else { Some(url) })
    }
}
