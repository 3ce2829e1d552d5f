//! Default values for gitlab-reconcile configuration.
//!
//! This module provides centralized default values used across the library
//! and the CLI, ensuring consistency and avoiding duplication.

use std::time::Duration;

/// GitLab instance used when no `--api-url` / `GITLAB_URL` is given.
pub const DEFAULT_API_URL: &str = "https://gitlab.com";

/// Environment variable holding the personal access token.
pub const TOKEN_ENV_VAR: &str = "GITLAB_TOKEN";

/// Header GitLab expects the personal access token in.
pub const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Page size requested from paginated GitLab endpoints (the API maximum).
pub const PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched for a single listing.
pub const MAX_PAGES: u32 = 10_000;

/// Deepest directory level below the group directory that is scanned for
/// checkouts (subgroup nesting).
pub const MAX_SCAN_DEPTH: usize = 8;

/// Default retry budget for transient API failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Timeout applied to each HTTP request and used to bound stalled git
/// transfers.
pub fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Delay before the first retry; doubles on every further attempt.
pub fn retry_backoff() -> Duration {
    Duration::from_millis(500)
}
