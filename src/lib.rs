//! # GitLab Reconcile Library
//!
//! This library keeps a local directory of Git checkouts in step with the
//! repositories of a GitLab group. It is used by the `gitlab-reconcile`
//! command-line tool but the pipeline is built from small, mockable parts
//! and can be driven from other programs.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::Path;
//! use gitlab_reconcile::catalog::{Catalog, RepositoryIdentity};
//! use gitlab_reconcile::config::{ConfigInput, Configuration};
//! use gitlab_reconcile::local::FsDirectoryLister;
//! use gitlab_reconcile::planner::{ActionKind, Planner};
//!
//! let config = Configuration::resolve(
//!     ConfigInput {
//!         group_id: "acme".to_string(),
//!         base_directory: Some("/work".into()),
//!         ..Default::default()
//!     },
//!     Path::new("/"),
//! )
//! .unwrap();
//!
//! let remote: Catalog = [RepositoryIdentity::remote(
//!     1,
//!     "api",
//!     "https://gitlab.com/acme/api.git",
//!     "acme/api",
//!     Some("main".to_string()),
//! )]
//! .into_iter()
//! .collect();
//! let local: Catalog = [RepositoryIdentity::local("old", "/work/old")]
//!     .into_iter()
//!     .collect();
//!
//! let plan = Planner::new(&config, &FsDirectoryLister)
//!     .plan(&remote, &local, &[])
//!     .unwrap();
//! assert_eq!(plan.names(ActionKind::Delete), vec!["old"]);
//! assert_eq!(plan.names(ActionKind::Clone), vec!["api"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: Validated run parameters and GitLab
//!   connection settings.
//! - **Catalogs (`catalog`, `remote`, `local`)**: The repositories GitLab
//!   reports for the group, and the checkouts found on disk.
//! - **Planning (`planner`)**: A pure comparison of both catalogs that yields
//!   an ordered list of actions.
//! - **Execution (`executor`, `git`)**: Applies the plan, asking once before
//!   deleting anything unless forced.
//!
//! ## Execution Flow
//!
//! [`reconcile::Reconciler`] runs the whole pipeline:
//!
//! 1.  **Local scan**: Find checkouts below the group directory.
//! 2.  **Remote listing**: Page through the group's projects, subgroups included.
//! 3.  **Planning**: Deletions, extra deletions, clones, then updates.
//! 4.  **Execution**: Run every action, collecting per-action outcomes.

pub mod catalog;
pub mod config;
pub mod defaults;
pub mod error;
pub mod executor;
pub mod git;
pub mod local;
pub mod output;
pub mod path;
pub mod planner;
pub mod reconcile;
pub mod remote;

#[cfg(test)]
mod planner_proptest;
#[cfg(test)]
pub(crate) mod testing;
