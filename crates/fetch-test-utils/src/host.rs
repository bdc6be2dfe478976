//! [`MemoryHost`]: an in-memory [`ContentClient`] with a request log.
//!
//! Repositories are declared with [`RepoFixture`], a builder over a flat map
//! of paths. Directories are implied by the files beneath them (or declared
//! explicitly for empty ones). The host follows hosting-API conventions:
//! listing a file or a submodule returns that single entry, and anything
//! beneath a submodule is not found in the parent repository.

use async_trait::async_trait;
use fetch_source::{CommitRef, ContentClient, DirectoryEntry, Error, RepoPath, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// A request observed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ResolveRef { repo: String, reference: String },
    List { repo: String, commit: String, path: String },
    Read { repo: String, commit: String, path: String },
}

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    /// Shown in listings but unreadable
    Unreadable,
    Directory,
    Submodule { repo: String, reference: String },
}

/// One repository pinned at a single commit.
///
/// # Example
///
/// ```rust
/// use fetch_test_utils::RepoFixture;
///
/// let repo = RepoFixture::new("gocardless/bump", "sha")
///     .file("Gemfile", "source 'https://rubygems.org'\n")
///     .submodule("plugins/bump-core", "dependabot/manifesto", "sha2");
/// assert_eq!(repo.name(), "gocardless/bump");
/// ```
#[derive(Debug, Clone)]
pub struct RepoFixture {
    name: String,
    commit: String,
    refs: Vec<String>,
    nodes: BTreeMap<RepoPath, Node>,
}

impl RepoFixture {
    /// Create a repository whose `HEAD` and `commit` both resolve to `commit`.
    pub fn new(name: impl Into<String>, commit: impl Into<String>) -> Self {
        let commit = commit.into();
        Self {
            name: name.into(),
            refs: vec!["HEAD".to_string(), commit.clone()],
            commit,
            nodes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add another ref (branch or tag) resolving to this fixture's commit.
    pub fn reference(mut self, name: impl Into<String>) -> Self {
        self.refs.push(name.into());
        self
    }

    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.nodes
            .insert(RepoPath::new(path), Node::File(content.as_ref().to_vec()));
        self
    }

    /// A file that shows up in its directory listing but 404s on read.
    pub fn unreadable(mut self, path: &str) -> Self {
        self.nodes.insert(RepoPath::new(path), Node::Unreadable);
        self
    }

    /// An explicit, possibly empty, directory.
    pub fn directory(mut self, path: &str) -> Self {
        self.nodes.insert(RepoPath::new(path), Node::Directory);
        self
    }

    pub fn submodule(mut self, path: &str, repo: &str, reference: &str) -> Self {
        self.nodes.insert(
            RepoPath::new(path),
            Node::Submodule {
                repo: repo.to_string(),
                reference: reference.to_string(),
            },
        );
        self
    }

    fn is_directory(&self, path: &RepoPath) -> bool {
        if path.is_root() {
            return true;
        }
        if matches!(self.nodes.get(path), Some(Node::Directory)) {
            return true;
        }
        self.nodes
            .keys()
            .any(|key| key != path && key.starts_with(path))
    }

    /// Whether `path` sits strictly beneath a submodule mount point.
    fn inside_submodule(&self, path: &RepoPath) -> bool {
        self.nodes.iter().any(|(key, node)| {
            matches!(node, Node::Submodule { .. }) && key != path && path.starts_with(key)
        })
    }

    fn entry_for(path: &RepoPath, node: &Node) -> DirectoryEntry {
        match node {
            Node::File(_) | Node::Unreadable => DirectoryEntry::file(path.clone()),
            Node::Directory => DirectoryEntry::directory(path.clone()),
            Node::Submodule { repo, reference } => {
                DirectoryEntry::submodule(path.clone(), repo.as_str(), reference.as_str())
            }
        }
    }

    fn list(&self, path: &RepoPath) -> Result<Vec<DirectoryEntry>> {
        if self.inside_submodule(path) {
            return Err(Error::not_found(path.as_str()));
        }
        match self.nodes.get(path) {
            Some(node @ (Node::File(_) | Node::Unreadable | Node::Submodule { .. })) => {
                return Ok(vec![Self::entry_for(path, node)]);
            }
            _ => {}
        }
        if !self.is_directory(path) {
            return Err(Error::not_found(path.as_str()));
        }

        let mut children: BTreeMap<RepoPath, DirectoryEntry> = BTreeMap::new();
        for (key, node) in &self.nodes {
            let Some(rest) = key.strip_prefix(path) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let first = rest.split('/').next().unwrap_or(rest);
            let child = path.join(first);
            let entry = if &child == key {
                Self::entry_for(key, node)
            } else {
                DirectoryEntry::directory(child.clone())
            };
            children.entry(child).or_insert(entry);
        }
        Ok(children.into_values().collect())
    }

    fn read(&self, path: &RepoPath) -> Result<Vec<u8>> {
        if self.inside_submodule(path) {
            return Err(Error::not_found(path.as_str()));
        }
        match self.nodes.get(path) {
            Some(Node::File(content)) => Ok(content.clone()),
            _ => Err(Error::not_found(path.as_str())),
        }
    }
}

/// In-memory hosting provider.
///
/// # Example
///
/// ```rust
/// use fetch_test_utils::{MemoryHost, RepoFixture};
///
/// let host = MemoryHost::new("github")
///     .with_repo(RepoFixture::new("gocardless/bump", "sha").file("Gemfile", ""));
/// assert!(host.requests().is_empty());
/// ```
pub struct MemoryHost {
    provider: String,
    repos: HashMap<String, RepoFixture>,
    failures: HashMap<String, Error>,
    log: Mutex<Vec<Request>>,
}

impl MemoryHost {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            repos: HashMap::new(),
            failures: HashMap::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_repo(mut self, repo: RepoFixture) -> Self {
        self.repos.insert(repo.name.clone(), repo);
        self
    }

    /// Make every list or read of `path` (in any repository) fail with `error`.
    pub fn with_failure(mut self, path: &str, error: Error) -> Self {
        self.failures
            .insert(RepoPath::new(path).as_str().to_string(), error);
        self
    }

    /// Every request observed so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }

    /// How many times `path` in `repo` was listed.
    pub fn list_count(&self, repo: &str, path: &str) -> usize {
        let path = RepoPath::new(path);
        self.requests()
            .iter()
            .filter(|r| matches!(r, Request::List { repo: r_repo, path: p, .. } if r_repo == repo && p == path.as_str()))
            .count()
    }

    /// How many times `path` in `repo` was read.
    pub fn read_count(&self, repo: &str, path: &str) -> usize {
        let path = RepoPath::new(path);
        self.requests()
            .iter()
            .filter(|r| matches!(r, Request::Read { repo: r_repo, path: p, .. } if r_repo == repo && p == path.as_str()))
            .count()
    }

    /// How many times a ref was resolved in `repo`.
    pub fn resolve_count(&self, repo: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, Request::ResolveRef { repo: r_repo, .. } if r_repo == repo))
            .count()
    }

    fn record(&self, request: Request) {
        self.log.lock().unwrap().push(request);
    }

    fn repo_at(&self, repo: &str, commit: &CommitRef) -> Result<&RepoFixture> {
        self.repos
            .get(repo)
            .filter(|fixture| fixture.commit == commit.as_str())
            .ok_or_else(|| Error::not_found(format!("{}@{}", repo, commit)))
    }

    fn injected_failure(&self, path: &RepoPath) -> Option<Error> {
        self.failures.get(path.as_str()).cloned()
    }
}

#[async_trait]
impl ContentClient for MemoryHost {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn resolve_ref(&self, repo: &str, reference: &str) -> Result<CommitRef> {
        self.record(Request::ResolveRef {
            repo: repo.to_string(),
            reference: reference.to_string(),
        });
        self.repos
            .get(repo)
            .filter(|fixture| fixture.refs.iter().any(|r| r == reference))
            .map(|fixture| CommitRef::new(fixture.commit.clone()))
            .ok_or_else(|| Error::not_found(format!("{}@{}", repo, reference)))
    }

    async fn list(
        &self,
        repo: &str,
        commit: &CommitRef,
        path: &RepoPath,
    ) -> Result<Vec<DirectoryEntry>> {
        self.record(Request::List {
            repo: repo.to_string(),
            commit: commit.to_string(),
            path: path.to_string(),
        });
        if let Some(error) = self.injected_failure(path) {
            return Err(error);
        }
        self.repo_at(repo, commit)?.list(path)
    }

    async fn read(&self, repo: &str, commit: &CommitRef, path: &RepoPath) -> Result<Vec<u8>> {
        self.record(Request::Read {
            repo: repo.to_string(),
            commit: commit.to_string(),
            path: path.to_string(),
        });
        if let Some(error) = self.injected_failure(path) {
            return Err(error);
        }
        self.repo_at(repo, commit)?.read(path)
    }
}
