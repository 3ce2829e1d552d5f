//! # Remote Catalog
//!
//! Lists the repositories owned by a GitLab group, including every subgroup,
//! and turns them into [`RepositoryIdentity`] values whose `name` is the
//! project's path relative to the group.
//!
//! The [`GroupRepositoryLister`] trait is the seam the rest of the crate
//! depends on; [`GitLabClient`] is the production implementation backed by a
//! blocking `reqwest` client. Tests substitute in-memory listers.
//!
//! ## Guarantees
//!
//! - Pagination is followed to the end; pages are merged and deduplicated by
//!   project id.
//! - A failure on any page fails the whole listing. A partially collected
//!   list is never returned.
//! - HTTP statuses map onto the crate's error taxonomy via
//!   [`classify_status`]: 401/403 → `Auth`, 404 → `NotFound`,
//!   408/429/5xx → `Transient`.
//! - Transient failures are retried with exponential backoff up to the
//!   configured budget.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::catalog::{Catalog, RepositoryIdentity};
use crate::config::{CloneProtocol, GitLabSettings};
use crate::defaults;
use crate::error::{Error, Result};
use crate::path::is_safe_repo_name;

/// Source of group membership data. Allows mocking in tests.
pub trait GroupRepositoryLister {
    /// Every repository in the group and its subgroups.
    fn list_group_repositories(&self, group_id: &str) -> Result<Vec<RepositoryIdentity>>;

    /// Usernames of the group's members.
    fn list_group_members(&self, group_id: &str) -> Result<Vec<String>>;
}

/// Build the remote catalog for `group_id`.
pub fn remote_catalog(lister: &dyn GroupRepositoryLister, group_id: &str) -> Result<Catalog> {
    let repositories = lister.list_group_repositories(group_id)?;
    info!(
        "Found {} repositories in group '{}' and its subgroups",
        repositories.len(),
        group_id
    );
    Ok(repositories.into_iter().collect())
}

#[derive(Debug, Deserialize)]
struct ApiGroup {
    full_path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiProject {
    id: u64,
    path_with_namespace: String,
    http_url_to_repo: String,
    ssh_url_to_repo: String,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    #[serde(default)]
    username: Option<String>,
}

/// One page of a paginated listing.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Value of the `X-Next-Page` header, if the server sent one. `Some(0)`
    /// marks the last page.
    pub next_page: Option<u32>,
}

/// Follow pagination until the server reports no next page or returns an
/// empty page.
///
/// `fetch` is called with 1-based page numbers. Any error aborts the whole
/// collection.
pub fn collect_pages<T, F>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        if page > defaults::MAX_PAGES {
            return Err(Error::RemoteResponse {
                url: String::from("(paginated listing)"),
                message: format!("pagination did not end after {} pages", defaults::MAX_PAGES),
            });
        }
        let current = fetch(page)?;
        if current.items.is_empty() {
            break;
        }
        items.extend(current.items);
        match current.next_page {
            Some(next) if next > page => page = next,
            Some(_) => break,
            // Servers that omit the header are paged until an empty page.
            None => page += 1,
        }
    }
    Ok(items)
}

/// Run `op`, retrying retryable failures up to `max_retries` extra times.
pub fn with_retries<T, F>(max_retries: u32, backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match op() {
            Err(err) if err.is_retryable() && attempt < max_retries => {
                let delay = backoff * 2u32.saturating_pow(attempt);
                warn!(
                    "{} (attempt {}/{}), retrying in {:?}",
                    err,
                    attempt + 1,
                    max_retries + 1,
                    delay
                );
                thread::sleep(delay);
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Map a non-success HTTP status to an error. Returns `None` for 2xx.
pub fn classify_status(status: u16, url: &str) -> Option<Error> {
    match status {
        200..=299 => None,
        401 | 403 => Some(Error::Auth {
            url: url.to_string(),
            message: format!("HTTP {}: check that the access token is valid and not expired", status),
        }),
        404 => Some(Error::NotFound {
            resource: url.to_string(),
        }),
        408 | 429 | 500..=599 => Some(Error::Transient {
            url: url.to_string(),
            message: format!("HTTP {}", status),
        }),
        _ => Some(Error::RemoteResponse {
            url: url.to_string(),
            message: format!("HTTP {}", status),
        }),
    }
}

/// Drop projects whose id was already seen, keeping the first occurrence.
fn dedupe_by_id(projects: Vec<ApiProject>) -> Vec<ApiProject> {
    let mut seen = HashSet::new();
    projects
        .into_iter()
        .filter(|project| seen.insert(project.id))
        .collect()
}

/// Convert listed projects to identities named relative to `group_path`.
fn to_identities(
    group_path: &str,
    projects: Vec<ApiProject>,
    protocol: CloneProtocol,
) -> Vec<RepositoryIdentity> {
    let prefix = format!("{}/", group_path.trim_end_matches('/'));
    let mut identities = Vec::with_capacity(projects.len());
    for project in dedupe_by_id(projects) {
        let Some(name) = project.path_with_namespace.strip_prefix(&prefix) else {
            warn!(
                "Skipping project {} ({}): not under group path {}",
                project.id, project.path_with_namespace, group_path
            );
            continue;
        };
        if !is_safe_repo_name(name) {
            warn!(
                "Skipping project {}: unusable path '{}'",
                project.id, project.path_with_namespace
            );
            continue;
        }
        let url = match protocol {
            CloneProtocol::Https => project.http_url_to_repo,
            CloneProtocol::Ssh => project.ssh_url_to_repo,
        };
        identities.push(RepositoryIdentity::remote(
            project.id,
            name,
            url,
            project.path_with_namespace.as_str(),
            project.default_branch,
        ));
    }
    identities
}

/// Read a whole response body. A connection that fails or closes before the
/// advertised length arrives is `Transient`; only the bytes that did arrive
/// are ever handed to the JSON decoder.
fn read_body(response: Response, url: &Url) -> Result<Vec<u8>> {
    let expected = response.content_length();
    let body = response.bytes().map_err(|e| Error::Transient {
        url: url.to_string(),
        message: format!("connection failed while reading the response: {}", e.without_url()),
    })?;
    if let Some(expected) = expected {
        if (body.len() as u64) < expected {
            return Err(Error::Transient {
                url: url.to_string(),
                message: format!(
                    "response body ended after {} of {} bytes",
                    body.len(),
                    expected
                ),
            });
        }
    }
    Ok(body.to_vec())
}

/// GitLab REST API client.
pub struct GitLabClient {
    http: Client,
    api_url: Url,
    token: SecretString,
    max_retries: u32,
    retry_backoff: Duration,
    clone_protocol: CloneProtocol,
}

impl GitLabClient {
    pub fn new(settings: GitLabSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_url: settings.api_url,
            token: settings.token,
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff,
            clone_protocol: settings.clone_protocol,
        })
    }

    /// `{api}/api/v4/groups/{group_id}/{rest...}` with the group id encoded
    /// as a single path segment (so `acme/backend` becomes `acme%2Fbackend`).
    fn group_url(&self, group_id: &str, rest: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::config(format!("invalid API URL: {}", self.api_url)))?;
            segments
                .pop_if_empty()
                .extend(["api", "v4", "groups", group_id])
                .extend(rest);
        }
        Ok(url)
    }

    fn send(&self, url: &Url) -> Result<Response> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url.clone())
            .header(defaults::TOKEN_HEADER, self.token.expose_secret())
            .send()
            .map_err(|e| Error::Transient {
                url: url.to_string(),
                message: e.without_url().to_string(),
            })?;
        match classify_status(response.status().as_u16(), url.as_str()) {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        with_retries(self.max_retries, self.retry_backoff, || {
            let body = read_body(self.send(url)?, url)?;
            serde_json::from_slice::<T>(&body).map_err(|e| Error::RemoteResponse {
                url: url.to_string(),
                message: format!("cannot decode JSON: {}", e),
            })
        })
    }

    fn get_page<T: DeserializeOwned>(&self, base: &Url, page: u32) -> Result<Page<T>> {
        let mut url = base.clone();
        url.query_pairs_mut()
            .append_pair("per_page", &defaults::PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string());
        with_retries(self.max_retries, self.retry_backoff, || {
            let response = self.send(&url)?;
            let next_page = response
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                // GitLab sends an empty header on the last page.
                .map(|v| v.trim().parse::<u32>().unwrap_or(0));
            let body = read_body(response, &url)?;
            let items =
                serde_json::from_slice::<Vec<T>>(&body).map_err(|e| Error::RemoteResponse {
                    url: url.to_string(),
                    message: format!("expected a JSON list: {}", e),
                })?;
            Ok(Page { items, next_page })
        })
    }

    fn group(&self, group_id: &str) -> Result<ApiGroup> {
        let url = self.group_url(group_id, &[])?;
        self.get_json(&url).map_err(|err| match err {
            Error::NotFound { .. } => Error::NotFound {
                resource: format!("GitLab group '{}'", group_id),
            },
            other => other,
        })
    }
}

impl GroupRepositoryLister for GitLabClient {
    fn list_group_repositories(&self, group_id: &str) -> Result<Vec<RepositoryIdentity>> {
        let group = self.group(group_id)?;
        let mut url = self.group_url(group_id, &["projects"])?;
        url.query_pairs_mut()
            .append_pair("include_subgroups", "true")
            .append_pair("with_shared", "false");
        let projects: Vec<ApiProject> = collect_pages(|page| self.get_page(&url, page))?;
        debug!(
            "Listed {} projects under {}",
            projects.len(),
            group.full_path
        );
        Ok(to_identities(&group.full_path, projects, self.clone_protocol))
    }

    fn list_group_members(&self, group_id: &str) -> Result<Vec<String>> {
        let url = self.group_url(group_id, &["members"])?;
        let members: Vec<ApiMember> = collect_pages(|page| self.get_page(&url, page))?;
        info!("Found {} members in group '{}'", members.len(), group_id);
        Ok(members.into_iter().filter_map(|m| m.username).collect())
    }
}
