//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new();
//! let origin = fixture.origin("api");
//! fixture.checkout("api", &origin);
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use gitlab_reconcile::catalog::RepositoryIdentity;
use gitlab_reconcile::error::Result;
use gitlab_reconcile::remote::GroupRepositoryLister;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, snapshot, FakeGitLab, FixedGroup, TestFixture};
}

/// Run git with a fixed identity and fail the test on error.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test User",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Every entry below `root` (`.git` internals included): files map to their
/// content, directories (empty ones too) to `None`.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .expect("entry below root")
                .to_path_buf();
            let content = if entry.file_type().is_dir() {
                None
            } else {
                Some(fs::read(entry.path()).expect("Failed to read file"))
            };
            (rel, content)
        })
        .collect()
}

/// Minimal GitLab REST API on a local port, serving one group and a fixed
/// project list. Every request is answered and the connection closed.
pub struct FakeGitLab {
    url: String,
}

impl FakeGitLab {
    /// Serve group `acme` with `projects` as `(path, clone URL)` pairs.
    pub fn start(projects: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        let url = format!("http://{}", listener.local_addr().expect("local address"));
        let list: Vec<serde_json::Value> = projects
            .iter()
            .enumerate()
            .map(|(i, (path, clone_url))| {
                serde_json::json!({
                    "id": i + 1,
                    "path_with_namespace": format!("acme/{}", path),
                    "http_url_to_repo": clone_url,
                    "ssh_url_to_repo": clone_url,
                    "default_branch": "main",
                })
            })
            .collect();
        let projects_body = serde_json::Value::Array(list).to_string();
        let group_body = serde_json::json!({ "full_path": "acme" }).to_string();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let request_line = read_request(&stream);
                let body = if request_line.contains("/projects") {
                    &projects_body
                } else {
                    &group_body
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     X-Next-Page: \r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Read the request head and return its first line.
fn read_request(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut first = String::new();
    let _ = reader.read_line(&mut first);
    let mut line = String::new();
    while reader.read_line(&mut line).unwrap_or(0) > 0 && line != "\r\n" {
        line.clear();
    }
    first
}

/// Group listing served from memory, pointing at local bare repositories.
#[derive(Default)]
pub struct FixedGroup {
    pub repositories: Vec<RepositoryIdentity>,
    pub members: Vec<String>,
}

impl FixedGroup {
    pub fn with_repo(mut self, name: &str, origin: &Path) -> Self {
        let id = self.repositories.len() as u64 + 1;
        self.repositories.push(RepositoryIdentity::remote(
            id,
            name,
            origin.to_string_lossy(),
            format!("acme/{}", name),
            Some("main".to_string()),
        ));
        self
    }
}

impl GroupRepositoryLister for FixedGroup {
    fn list_group_repositories(&self, _group_id: &str) -> Result<Vec<RepositoryIdentity>> {
        Ok(self.repositories.clone())
    }

    fn list_group_members(&self, _group_id: &str) -> Result<Vec<String>> {
        Ok(self.members.clone())
    }
}

/// A base directory for checkouts plus a separate directory of bare origins.
pub struct TestFixture {
    base: assert_fs::TempDir,
    origins: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            base: assert_fs::TempDir::new().expect("Failed to create temp directory"),
            origins: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// The base directory.
    pub fn path(&self) -> &Path {
        self.base.path()
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.base.child(path)
    }

    /// Bare repository `<name>.git` with one commit on `main`.
    pub fn origin(&self, name: &str) -> PathBuf {
        let origin = self.origins.path().join(format!("{}.git", name));
        fs::create_dir_all(&origin).expect("Failed to create origin");
        git(&origin, &["init", "--bare", "-b", "main"]);
        let seed = self.seed_path(name);
        git(
            self.origins.path(),
            &[
                "clone",
                origin.to_str().expect("utf-8 path"),
                seed.to_str().expect("utf-8 path"),
            ],
        );
        git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        fs::write(seed.join("README.md"), format!("{} v1", name)).expect("Failed to write");
        git(&seed, &["add", "."]);
        git(&seed, &["commit", "-m", "initial"]);
        git(&seed, &["push", "origin", "main"]);
        origin
    }

    /// Push a new commit to `name`'s origin and return its hash.
    pub fn push_change(&self, name: &str, content: &str) -> String {
        let seed = self.seed_path(name);
        fs::write(seed.join("README.md"), content).expect("Failed to write");
        git(&seed, &["commit", "-am", "change"]);
        git(&seed, &["push", "origin", "main"]);
        git(&seed, &["rev-parse", "HEAD"])
    }

    /// Clone `origin` into `<base>/<name>`.
    pub fn checkout(&self, name: &str, origin: &Path) -> PathBuf {
        let target = self.path().join(name);
        git(
            self.path(),
            &[
                "clone",
                origin.to_str().expect("utf-8 path"),
                target.to_str().expect("utf-8 path"),
            ],
        );
        target
    }

    /// A `gitlab-reconcile` command run from the base directory that can
    /// never reach a real GitLab.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("gitlab-reconcile");
        cmd.current_dir(self.path())
            .env_remove("GITLAB_GROUP_ID")
            .env_remove("GITLAB_RECONCILE_BASE_DIR")
            .env_remove("RUST_LOG")
            .env_remove("HTTP_PROXY")
            .env_remove("http_proxy")
            .env_remove("ALL_PROXY")
            .env_remove("all_proxy")
            .env("GITLAB_TOKEN", "test-token")
            .env("GITLAB_URL", "http://127.0.0.1:9");
        cmd
    }

    fn seed_path(&self, name: &str) -> PathBuf {
        self.origins.path().join(format!("{}-seed", name))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dirs() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_snapshot_sees_nested_files() {
        let fixture = TestFixture::new();
        fixture.child("a/b.txt").write_str("hello").unwrap();
        let snap = snapshot(fixture.path());
        assert_eq!(
            snap.get(Path::new("a/b.txt")),
            Some(&Some(b"hello".to_vec()))
        );
        assert_eq!(snap.get(Path::new("a")), Some(&None));
    }

    #[test]
    fn test_snapshot_sees_empty_directories() {
        let fixture = TestFixture::new();
        let before = snapshot(fixture.path());
        fs::create_dir(fixture.path().join("empty")).unwrap();
        assert_ne!(snapshot(fixture.path()), before);
    }
}
