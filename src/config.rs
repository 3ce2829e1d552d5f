//! # Run Configuration
//!
//! The reconciliation core never reads ambient process state. Everything it
//! needs arrives as a [`Configuration`] (what to reconcile and how) and a
//! [`GitLabSettings`] (how to talk to the API), both built once per run and
//! passed down by reference.
//!
//! [`Configuration::resolve`] turns loosely-typed [`ConfigInput`] (as
//! collected by the CLI) into a validated value:
//!
//! - relative paths are resolved and lexically normalised,
//! - `group_directory` must lie inside `base_directory`,
//! - every `include_directories` entry must lie strictly inside
//!   `base_directory` and must not contain the group directory.
//!
//! A violation is an [`Error::Config`]; nothing is scanned or deleted.

use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::defaults;
use crate::error::{Error, Result};
use crate::path::{absolutize, is_strict_descendant, is_within};

/// Raw, unvalidated configuration values.
#[derive(Debug, Clone, Default)]
pub struct ConfigInput {
    pub group_id: String,
    pub base_directory: Option<PathBuf>,
    pub group_directory: Option<PathBuf>,
    pub include_directories: Vec<PathBuf>,
    pub force: bool,
    pub dry_run: bool,
    pub update: bool,
    pub delete_member_directories: bool,
}

/// Validated, immutable configuration for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    group_id: String,
    base_directory: PathBuf,
    group_directory: PathBuf,
    include_directories: BTreeSet<PathBuf>,
    force: bool,
    dry_run: bool,
    update: bool,
    delete_member_directories: bool,
}

impl Configuration {
    /// Validate `input`, resolving relative paths against `cwd`.
    pub fn resolve(input: ConfigInput, cwd: &Path) -> Result<Self> {
        let group_id = input.group_id.trim().to_string();
        if group_id.is_empty() {
            return Err(Error::config("a GitLab group id or path is required"));
        }

        let cwd = if cwd.is_absolute() {
            cwd.to_path_buf()
        } else {
            return Err(Error::config(format!(
                "working directory must be absolute: {}",
                cwd.display()
            )));
        };

        let base_directory = match input.base_directory {
            Some(dir) => absolutize(&dir, &cwd),
            None => absolutize(&cwd, &cwd),
        };

        let group_directory = match input.group_directory {
            Some(dir) => absolutize(&dir, &base_directory),
            None => base_directory.clone(),
        };
        if !is_within(&group_directory, &base_directory) {
            return Err(Error::config(format!(
                "group directory {} is outside base directory {}",
                group_directory.display(),
                base_directory.display()
            )));
        }

        let mut include_directories = BTreeSet::new();
        for dir in input.include_directories {
            let resolved = absolutize(&dir, &base_directory);
            if !is_strict_descendant(&resolved, &base_directory) {
                return Err(Error::config(format!(
                    "include directory {} is outside base directory {}",
                    resolved.display(),
                    base_directory.display()
                )));
            }
            if is_within(&group_directory, &resolved) {
                return Err(Error::config(format!(
                    "include directory {} contains the group directory {}",
                    resolved.display(),
                    group_directory.display()
                )));
            }
            include_directories.insert(resolved);
        }

        Ok(Self {
            group_id,
            base_directory,
            group_directory,
            include_directories,
            force: input.force,
            dry_run: input.dry_run,
            update: input.update,
            delete_member_directories: input.delete_member_directories,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn group_directory(&self) -> &Path {
        &self.group_directory
    }

    /// Absolute, normalised extra directories to delete, in path order.
    pub fn include_directories(&self) -> impl Iterator<Item = &Path> {
        self.include_directories.iter().map(PathBuf::as_path)
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn update(&self) -> bool {
        self.update
    }

    pub fn delete_member_directories(&self) -> bool {
        self.delete_member_directories
    }
}

/// Which of a project's clone URLs to use for new clones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloneProtocol {
    #[default]
    Https,
    Ssh,
}

impl fmt::Display for CloneProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloneProtocol::Https => write!(f, "https"),
            CloneProtocol::Ssh => write!(f, "ssh"),
        }
    }
}

/// Connection settings for the GitLab API client.
///
/// `Debug` is derived; the token is a `SecretString` and prints redacted.
#[derive(Debug)]
pub struct GitLabSettings {
    pub api_url: Url,
    pub token: SecretString,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub clone_protocol: CloneProtocol,
}

impl GitLabSettings {
    /// Settings with default timeout and retry policy.
    pub fn new(api_url: &str, token: SecretString) -> Result<Self> {
        let api_url = Url::parse(api_url)?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "API URL must use http or https: {}",
                api_url
            )));
        }
        Ok(Self {
            api_url,
            token,
            timeout: defaults::default_timeout(),
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            retry_backoff: defaults::retry_backoff(),
            clone_protocol: CloneProtocol::default(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_clone_protocol(mut self, protocol: CloneProtocol) -> Self {
        self.clone_protocol = protocol;
        self
    }
}

/// Read the access token from `GITLAB_TOKEN`.
pub fn token_from_env() -> Result<SecretString> {
    match env::var(defaults::TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(SecretString::from(token.trim().to_string())),
        _ => Err(Error::config(format!(
            "{} is not set in the environment",
            defaults::TOKEN_ENV_VAR
        ))),
    }
}
