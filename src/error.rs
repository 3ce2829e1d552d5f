//! # Error Handling
//!
//! This module defines the centralized error type for `gitlab-reconcile`. It
//! uses the `thiserror` library to build a single `Error` enum covering every
//! failure the reconciliation core can report.
//!
//! The variants fall into three groups, which the rest of the crate treats
//! differently:
//!
//! - **Configuration** (`Config`): invalid or missing configuration. Raised
//!   before any catalog is built.
//! - **Catalog construction** (`Auth`, `NotFound`, `Transient`,
//!   `RemoteResponse`, `Path`): fatal for the whole run. Reconciliation never
//!   proceeds on an incomplete view of either side.
//! - **Per-action** (`Clone`, `GitOperation`, `Permission`): recorded in the
//!   run report against a single action; the batch keeps going.
//!
//! `Result<T>` is the crate-wide alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for gitlab-reconcile operations
#[derive(Error, Debug)]
pub enum Error {
    /// The supplied configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The GitLab API rejected the credentials (401/403).
    #[error("Authentication failed for {url}: {message}")]
    Auth { url: String, message: String },

    /// The requested group (or other resource) does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// A network failure or server-side error that may succeed on retry.
    #[error("Transient remote error for {url}: {message}")]
    Transient { url: String, message: String },

    /// The API answered with something the client cannot use: an unexpected
    /// status code or a body that does not decode.
    #[error("Unexpected response from {url}: {message}")]
    RemoteResponse { url: String, message: String },

    /// A local directory required for scanning is missing or unusable.
    #[error("Path error for {}: {message}", path.display())]
    Path { path: PathBuf, message: String },

    /// `git clone` exited with a failure status.
    #[error("Git clone error for {url} into {}: {message}", path.display())]
    Clone {
        url: String,
        path: PathBuf,
        message: String,
    },

    /// A git command against an existing checkout failed.
    #[error("Git command failed in {}: {command} - {message}", path.display())]
    GitOperation {
        path: PathBuf,
        command: String,
        message: String,
    },

    /// A directory could not be removed, or removal was refused because the
    /// target lies outside the base directory.
    #[error("Permission error for {}: {message}", path.display())]
    Permission { path: PathBuf, message: String },

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for building an [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
