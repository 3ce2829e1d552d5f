//! In-memory fakes shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, RepositoryIdentity};
use crate::error::{Error, Result};
use crate::executor::{Confirmer, DirectoryRemover};
use crate::git::GitClient;
use crate::local::{DirEntryInfo, DirectoryLister};
use crate::remote::GroupRepositoryLister;

/// Remote catalog for group `acme` with HTTPS URLs and `main` branches.
pub fn remote_catalog(names: &[&str]) -> Catalog {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            RepositoryIdentity::remote(
                i as u64 + 1,
                *name,
                format!("https://gitlab.com/acme/{}.git", name),
                format!("acme/{}", name),
                Some("main".to_string()),
            )
        })
        .collect()
}

/// Local catalog of checkouts under `/work`.
pub fn local_catalog(names: &[&str]) -> Catalog {
    names
        .iter()
        .map(|name| RepositoryIdentity::local(*name, format!("/work/{}", name)))
        .collect()
}

/// Directory tree held in memory.
#[derive(Debug, Default)]
pub struct MemoryLister {
    dirs: BTreeMap<PathBuf, Vec<DirEntryInfo>>,
    files: BTreeSet<PathBuf>,
}

impl MemoryLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.ensure_dir(Path::new(path));
        self
    }

    /// A directory containing a `.git` directory.
    pub fn with_repo(self, path: &str) -> Self {
        self.with_dir(&format!("{}/.git", path))
    }

    pub fn with_file(mut self, path: &str) -> Self {
        let path = Path::new(path);
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.ensure_dir(parent);
            self.add_entry(parent, DirEntryInfo::file(name.to_string_lossy()));
        }
        self.files.insert(path.to_path_buf());
        self
    }

    fn ensure_dir(&mut self, path: &Path) {
        if self.dirs.contains_key(path) {
            return;
        }
        self.dirs.insert(path.to_path_buf(), Vec::new());
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.ensure_dir(parent);
            self.add_entry(parent, DirEntryInfo::dir(name.to_string_lossy()));
        }
    }

    fn add_entry(&mut self, dir: &Path, entry: DirEntryInfo) {
        let entries = self.dirs.entry(dir.to_path_buf()).or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
}

impl DirectoryLister for MemoryLister {
    fn entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        self.dirs
            .get(dir)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, dir.display().to_string()))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains_key(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.dirs.contains_key(path) || self.files.contains(path)
    }
}

/// Records git calls; selected paths fail.
#[derive(Debug, Default)]
pub struct FakeGit {
    clones: RefCell<Vec<PathBuf>>,
    updates: RefCell<Vec<PathBuf>>,
    failing_clones: HashSet<PathBuf>,
    failing_updates: HashSet<PathBuf>,
    origins: HashMap<PathBuf, String>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_clone(mut self, path: &str) -> Self {
        self.failing_clones.insert(PathBuf::from(path));
        self
    }

    pub fn failing_update(mut self, path: &str) -> Self {
        self.failing_updates.insert(PathBuf::from(path));
        self
    }

    pub fn with_origin(mut self, path: &str, url: &str) -> Self {
        self.origins.insert(PathBuf::from(path), url.to_string());
        self
    }

    pub fn clones(&self) -> Vec<PathBuf> {
        self.clones.borrow().clone()
    }

    pub fn updates(&self) -> Vec<PathBuf> {
        self.updates.borrow().clone()
    }

    /// Number of mutating calls.
    pub fn calls(&self) -> usize {
        self.clones.borrow().len() + self.updates.borrow().len()
    }
}

impl GitClient for FakeGit {
    fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
        self.clones.borrow_mut().push(target.to_path_buf());
        if self.failing_clones.contains(target) {
            return Err(Error::Clone {
                url: url.to_string(),
                path: target.to_path_buf(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn update_repository(&self, path: &Path, _branch: Option<&str>) -> Result<()> {
        self.updates.borrow_mut().push(path.to_path_buf());
        if self.failing_updates.contains(path) {
            return Err(Error::GitOperation {
                path: path.to_path_buf(),
                command: "reset --hard".to_string(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn origin_url(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.origins.get(path).cloned())
    }
}

/// In-memory set of existing paths, with optional symlink-style aliases.
#[derive(Debug, Default)]
pub struct MemoryRemover {
    existing: RefCell<BTreeSet<PathBuf>>,
    aliases: HashMap<PathBuf, PathBuf>,
    removed: RefCell<Vec<PathBuf>>,
    calls: Cell<usize>,
}

impl MemoryRemover {
    pub fn new(paths: &[&str]) -> Self {
        Self {
            existing: RefCell::new(paths.iter().map(PathBuf::from).collect()),
            ..Default::default()
        }
    }

    /// `path` exists and canonicalises to `target`.
    pub fn with_alias(mut self, path: &str, target: &str) -> Self {
        self.existing.borrow_mut().insert(PathBuf::from(path));
        self.aliases
            .insert(PathBuf::from(path), PathBuf::from(target));
        self
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DirectoryRemover for MemoryRemover {
    fn locate(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        self.calls.set(self.calls.get() + 1);
        if !self.existing.borrow().contains(path) {
            return Ok(None);
        }
        Ok(Some(
            self.aliases
                .get(path)
                .cloned()
                .unwrap_or_else(|| path.to_path_buf()),
        ))
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.calls.set(self.calls.get() + 1);
        self.existing.borrow_mut().remove(path);
        self.removed.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

/// Answers every prompt with a fixed reply and remembers what it was asked.
#[derive(Debug)]
pub struct ScriptedConfirmer {
    answer: bool,
    prompts: Vec<Vec<PathBuf>>,
}

impl ScriptedConfirmer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Vec::new(),
        }
    }

    pub fn asked(&self) -> usize {
        self.prompts.len()
    }

    pub fn last_prompt(&self) -> Vec<PathBuf> {
        self.prompts.last().cloned().unwrap_or_default()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm_deletions(&mut self, paths: &[PathBuf]) -> bool {
        self.prompts.push(paths.to_vec());
        self.answer
    }
}

/// Fixed group listing; optionally fails.
#[derive(Default)]
pub struct FakeGroup {
    pub repositories: Vec<RepositoryIdentity>,
    pub members: Vec<String>,
    pub error: Option<fn() -> Error>,
}

impl GroupRepositoryLister for FakeGroup {
    fn list_group_repositories(&self, _group_id: &str) -> Result<Vec<RepositoryIdentity>> {
        match self.error {
            Some(make) => Err(make()),
            None => Ok(self.repositories.clone()),
        }
    }

    fn list_group_members(&self, _group_id: &str) -> Result<Vec<String>> {
        Ok(self.members.clone())
    }
}
