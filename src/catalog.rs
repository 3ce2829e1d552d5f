//! Repository identities and name-keyed catalogs.
//!
//! A [`Catalog`] is an in-memory snapshot of the repositories one source
//! knows about (the GitLab group, or the local directory tree). Entries are
//! keyed by [`RepositoryIdentity::name`], the join key between the two
//! sides, and iterate in name order so every plan derived from them is
//! deterministic.

use std::collections::btree_map::{self, BTreeMap};

use log::warn;
use url::Url;

/// One repository as seen by a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryIdentity {
    /// Path relative to the group (`api`, `backend/api`); the join key.
    pub name: String,
    /// Clone URL. Always set for remote identities; for local identities it
    /// holds the checkout's `origin` URL once known.
    pub remote_url: Option<String>,
    /// Remote: `path_with_namespace`. Local: the checkout's directory.
    pub full_path: String,
    /// GitLab project id (remote identities only).
    pub id: Option<u64>,
    /// Default branch advertised by GitLab (remote identities only).
    pub default_branch: Option<String>,
}

impl RepositoryIdentity {
    /// Identity for a project listed by the GitLab API.
    pub fn remote(
        id: u64,
        name: impl Into<String>,
        remote_url: impl Into<String>,
        full_path: impl Into<String>,
        default_branch: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            remote_url: Some(remote_url.into()),
            full_path: full_path.into(),
            id: Some(id),
            default_branch,
        }
    }

    /// Identity for a checkout found on disk.
    pub fn local(name: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_url: None,
            full_path: full_path.into(),
            id: None,
            default_branch: None,
        }
    }
}

/// Name-unique, name-ordered collection of identities.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, RepositoryIdentity>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identity. Returns `false` (and keeps the existing entry) when
    /// the name is already present.
    pub fn insert(&mut self, identity: RepositoryIdentity) -> bool {
        match self.entries.entry(identity.name.clone()) {
            btree_map::Entry::Occupied(existing) => {
                warn!(
                    "Duplicate repository name '{}' ({} and {}); keeping the first",
                    identity.name,
                    existing.get().full_path,
                    identity.full_path
                );
                false
            }
            btree_map::Entry::Vacant(slot) => {
                slot.insert(identity);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryIdentity> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RepositoryIdentity> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Identities in name order.
    pub fn iter(&self) -> impl Iterator<Item = &RepositoryIdentity> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RepositoryIdentity> for Catalog {
    fn from_iter<I: IntoIterator<Item = RepositoryIdentity>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for identity in iter {
            catalog.insert(identity);
        }
        catalog
    }
}

/// Reduce a clone URL to `host/path` so HTTPS, SSH and scp-style URLs for the
/// same project compare equal.
///
/// Returns `None` for strings that are not recognisable clone URLs.
pub fn repository_key(url: &str) -> Option<String> {
    let url = url.trim();
    let (host, path) = if url.contains("://") {
        let parsed = Url::parse(url).ok()?;
        (parsed.host_str()?.to_string(), parsed.path().to_string())
    } else {
        // scp-like syntax: [user@]host:path
        let (authority, path) = url.split_once(':')?;
        let host = authority.rsplit('@').next()?;
        if host.is_empty() || host.contains('/') {
            return None;
        }
        (host.to_string(), path.to_string())
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path).trim_end_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(format!("{}/{}", host.to_ascii_lowercase(), path))
}

/// True when both URLs refer to the same repository. Unparseable URLs only
/// match when byte-identical.
pub fn same_repository(a: &str, b: &str) -> bool {
    match (repository_key(a), repository_key(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}
