//! The fetch session: a depth-first walk of the reference graph

mod path_dependency;

use path_dependency::SearchOutcome;

use crate::classify::ErrorClassifier;
use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::file::{FetchedFile, FileRole, UnreachableDependency};
use fetch_rules::{ManifestRules, Reference, ReferenceKind, RulesRegistry};
use fetch_source::{
    CachingClient, ContentClient, DirectoryEntry, RepoPath, SourceContext, SourceDescriptor,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Fetches the dependency files of one directory in a remote repository.
///
/// A session is reusable; every [`run`](FetchSession::run) starts with an
/// empty cache and visited set, so nothing is shared between runs.
///
/// # Example
///
/// ```rust,no_run
/// use fetch_core::{FetchConfig, FetchSession};
/// use fetch_source::{ContentClient, SourceDescriptor};
/// use std::sync::Arc;
///
/// async fn fetch(client: Arc<dyn ContentClient>) -> fetch_core::Result<()> {
///     let session = FetchSession::from_config(client, FetchConfig::default())?;
///     let source = SourceDescriptor::new("github", "gocardless/bump").with_directory("/");
///     for file in session.run(&source).await? {
///         println!("{}", file.path);
///     }
///     Ok(())
/// }
/// ```
pub struct FetchSession {
    client: Arc<dyn ContentClient>,
    rules: Arc<dyn ManifestRules>,
    config: FetchConfig,
}

impl FetchSession {
    pub fn new(
        client: Arc<dyn ContentClient>,
        rules: Arc<dyn ManifestRules>,
        config: FetchConfig,
    ) -> Self {
        Self {
            client,
            rules,
            config,
        }
    }

    /// Build a session using the built-in rules for `config.ecosystem`.
    pub fn from_config(client: Arc<dyn ContentClient>, config: FetchConfig) -> Result<Self> {
        let rules = RulesRegistry::with_builtins()
            .get(&config.ecosystem)
            .ok_or_else(|| Error::UnknownEcosystem {
                id: config.ecosystem.clone(),
            })?;
        Ok(Self::new(client, rules, config))
    }

    pub fn ecosystem(&self) -> &str {
        self.rules.id()
    }

    /// Fetch every dependency file reachable from `source`.
    ///
    /// Files come back in discovery order: the primary manifest, its lock
    /// file, specification files beside the manifest, then everything
    /// reached depth-first from their references.
    pub async fn run(&self, source: &SourceDescriptor) -> Result<Vec<FetchedFile>> {
        let client = CachingClient::new(self.client.clone());
        let reference = source
            .reference
            .as_deref()
            .unwrap_or(&self.config.default_ref);
        if source.provider != client.provider() {
            tracing::warn!(
                requested = %source.provider,
                client = client.provider(),
                "Source provider differs from client provider"
            );
        }
        tracing::info!(
            repo = %source.repo,
            reference,
            directory = %source.directory,
            ecosystem = self.rules.id(),
            "Fetching dependency files"
        );

        let context = client.open_context(&source.repo, reference).await?;
        let traversal = Traversal {
            client,
            rules: self.rules.clone(),
            config: self.config.clone(),
            base: source.directory.clone(),
            root: Arc::new(Scope {
                context,
                mount: RepoPath::root(),
            }),
            files: Vec::new(),
            visited: HashSet::new(),
            searched: HashMap::new(),
            unreachable: Vec::new(),
            lockfile_authoritative: false,
        };
        traversal.run().await
    }
}

impl std::fmt::Debug for FetchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchSession")
            .field("provider", &self.client.provider())
            .field("ecosystem", &self.rules.id())
            .field("config", &self.config)
            .finish()
    }
}

/// A repository mounted somewhere in the root repository's tree.
#[derive(Debug)]
struct Scope {
    context: SourceContext,
    /// Where this repository's root sits, in root-repository coordinates
    mount: RepoPath,
}

/// A path inside a particular scope.
#[derive(Debug, Clone)]
struct Location {
    scope: Arc<Scope>,
    path: RepoPath,
}

type VisitedKey = (SourceContext, RepoPath);

impl Location {
    fn context(&self) -> &SourceContext {
        &self.scope.context
    }

    fn at(&self, path: RepoPath) -> Location {
        Location {
            scope: self.scope.clone(),
            path,
        }
    }

    fn child(&self, name: &str) -> Location {
        self.at(self.path.join(name))
    }

    /// Resolve a path written in the file at `self`, relative to its directory.
    fn resolve(&self, relative: &str) -> Location {
        let directory = self.path.parent().unwrap_or_default();
        self.at(directory.join(relative))
    }

    fn root_path(&self) -> RepoPath {
        self.scope.mount.join(self.path.as_str())
    }

    fn key(&self) -> VisitedKey {
        (self.scope.context.clone(), self.path.clone())
    }
}

/// A reference waiting to be followed.
#[derive(Debug)]
struct Pending {
    reference: Reference,
    origin: Location,
    from_lockfile: bool,
}

/// State for a single run.
struct Traversal {
    client: CachingClient,
    rules: Arc<dyn ManifestRules>,
    config: FetchConfig,
    /// Requested directory in root-repository coordinates
    base: RepoPath,
    root: Arc<Scope>,
    files: Vec<FetchedFile>,
    visited: HashSet<VisitedKey>,
    /// Outcome of the specification search per directory
    searched: HashMap<VisitedKey, SearchOutcome>,
    unreachable: Vec<UnreachableDependency>,
    lockfile_authoritative: bool,
}

impl Traversal {
    async fn run(mut self) -> Result<Vec<FetchedFile>> {
        let (base_dir, entries) = self.open_base().await?;
        let (manifest, manifest_name) = self.select_manifest(&base_dir, &entries)?;

        let content = self.fetch_required(&manifest, FileRole::Manifest).await?;
        let manifest_text = String::from_utf8_lossy(&content).into_owned();

        let lock_references = self
            .fetch_lockfile(&base_dir, &entries, manifest_name, &manifest_text)
            .await?;
        let specs = self.fetch_beside_specs(&base_dir, &entries).await?;

        let mut discovered = self.scan(&manifest, &manifest_text)?;
        discovered.extend(lock_references);
        for (spec, text) in &specs {
            discovered.extend(self.scan(spec, text)?);
        }

        let mut stack: Vec<Pending> = discovered.into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            let found = self.visit(next, &base_dir).await?;
            stack.extend(found.into_iter().rev());
        }

        self.finish()
    }

    async fn open_base(&self) -> Result<(Location, Arc<Vec<DirectoryEntry>>)> {
        let base = Location {
            scope: self.root.clone(),
            path: self.base.clone(),
        };
        let not_found = || Error::DirectoryNotFound {
            directory: self.base.to_string(),
        };
        let entries = self
            .client
            .list(base.context(), &base.path)
            .await
            .map_err(|e| ErrorClassifier::listing(e, self.base.as_str()))?;

        match single_entry(&entries, &base.path) {
            Some(entry) if entry.is_submodule() && self.config.follow_submodules => {
                let entry = entry.clone();
                let root = self
                    .enter_submodule(&base.scope, &entry)
                    .await?
                    .ok_or_else(not_found)?;
                let entries = self
                    .client
                    .list(root.context(), &root.path)
                    .await
                    .map_err(|e| ErrorClassifier::listing(e, self.base.as_str()))?;
                Ok((root, entries))
            }
            Some(_) => Err(not_found()),
            None => Ok((base, entries)),
        }
    }

    fn select_manifest(
        &self,
        base_dir: &Location,
        entries: &[DirectoryEntry],
    ) -> Result<(Location, &'static str)> {
        let candidates = self.rules.primary_manifest_candidates();
        let present = candidates
            .iter()
            .copied()
            .find(|name| entries.iter().any(|e| e.is_file() && e.name == *name));
        match present {
            Some(name) => {
                tracing::debug!(manifest = name, "Found primary manifest");
                Ok((base_dir.child(name), name))
            }
            None => {
                let first = candidates.first().copied().unwrap_or_default();
                Err(Error::DependencyFileNotFound {
                    file_path: base_dir.child(first).root_path().to_string(),
                })
            }
        }
    }

    async fn fetch_lockfile(
        &mut self,
        base_dir: &Location,
        entries: &[DirectoryEntry],
        manifest_name: &str,
        manifest_text: &str,
    ) -> Result<Vec<Pending>> {
        let Some(lock_name) = self.rules.lockfile_name_for(manifest_name) else {
            return Ok(Vec::new());
        };
        let lockfile = base_dir.child(&lock_name);
        let required =
            self.config.require_lockfile || self.rules.lockfile_required(manifest_text);
        let listed = entries.iter().any(|e| e.is_file() && e.name == lock_name);

        let content = if listed {
            self.fetch_optional(&lockfile, FileRole::Lockfile).await?
        } else {
            None
        };
        let Some(content) = content else {
            if required {
                return Err(Error::DependencyFileNotFound {
                    file_path: lockfile.root_path().to_string(),
                });
            }
            tracing::debug!(lockfile = %lock_name, "No lock file present");
            return Ok(Vec::new());
        };

        let origin = self.display_path(&lockfile);
        let scan = self
            .rules
            .scan_lockfile(&String::from_utf8_lossy(&content), &origin)
            .map_err(|e| ErrorClassifier::rules(e, lockfile.root_path().as_str()))?;
        self.lockfile_authoritative = scan.authoritative;

        Ok(scan
            .references
            .into_iter()
            .map(|reference| Pending {
                reference,
                origin: lockfile.clone(),
                from_lockfile: true,
            })
            .collect())
    }

    async fn fetch_beside_specs(
        &mut self,
        base_dir: &Location,
        entries: &[DirectoryEntry],
    ) -> Result<Vec<(Location, String)>> {
        let candidates: Vec<Location> = entries
            .iter()
            .filter(|e| e.is_file() && self.rules.is_beside_manifest_spec(&e.name))
            .map(|e| base_dir.at(e.path.clone()))
            .collect();

        let mut specs = Vec::new();
        for spec in candidates {
            if self.visited.contains(&spec.key()) {
                continue;
            }
            if let Some(content) = self.fetch_optional(&spec, FileRole::Specification).await? {
                specs.push((spec, String::from_utf8_lossy(&content).into_owned()));
            }
        }
        Ok(specs)
    }

    async fn visit(&mut self, pending: Pending, base_dir: &Location) -> Result<Vec<Pending>> {
        let Pending {
            reference,
            origin,
            from_lockfile,
        } = pending;

        match reference.kind {
            ReferenceKind::ChildManifest => {
                let target = origin.resolve(&reference.path);
                if self.visited.contains(&target.key()) {
                    tracing::debug!(path = %target.root_path(), "Already fetched");
                    return Ok(Vec::new());
                }
                let content = self.fetch_required(&target, FileRole::ChildManifest).await?;
                let text = String::from_utf8_lossy(&content).into_owned();
                self.scan(&target, &text)
            }
            ReferenceKind::SupportFile => {
                let target = base_dir.child(&reference.path);
                if !self.visited.contains(&target.key()) && self.exists(&target).await? {
                    self.fetch_optional(&target, FileRole::Support).await?;
                }
                Ok(Vec::new())
            }
            ReferenceKind::PathDependency { name } => {
                if self.lockfile_authoritative && !from_lockfile {
                    tracing::debug!(dependency = %name, "Path dependencies come from the lock file");
                    return Ok(Vec::new());
                }
                self.visit_path_dependency(&name, origin.resolve(&reference.path))
                    .await
            }
        }
    }

    /// Scan a fetched file for further references.
    fn scan(&self, location: &Location, text: &str) -> Result<Vec<Pending>> {
        let origin = self.display_path(location);
        let references = self
            .rules
            .extract_references(text, &origin)
            .map_err(|e| ErrorClassifier::rules(e, location.root_path().as_str()))?;
        Ok(references
            .into_iter()
            .map(|reference| Pending {
                reference,
                origin: location.clone(),
                from_lockfile: false,
            })
            .collect())
    }

    /// Whether `location` is a file, judged from its directory's listing.
    async fn exists(&self, location: &Location) -> Result<bool> {
        let directory = location.path.parent().unwrap_or_default();
        match self.client.list(location.context(), &directory).await {
            Ok(entries) => Ok(entries
                .iter()
                .any(|e| e.is_file() && e.path == location.path)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_required(
        &mut self,
        location: &Location,
        role: FileRole,
    ) -> Result<Arc<Vec<u8>>> {
        let content = self
            .client
            .read(location.context(), &location.path)
            .await
            .map_err(|e| ErrorClassifier::mandated_read(e, location.root_path().as_str()))?;
        self.record(location, &content, role);
        Ok(content)
    }

    async fn fetch_optional(
        &mut self,
        location: &Location,
        role: FileRole,
    ) -> Result<Option<Arc<Vec<u8>>>> {
        match self.client.read(location.context(), &location.path).await {
            Ok(content) => {
                self.record(location, &content, role);
                Ok(Some(content))
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %location.root_path(), "Optional file not readable");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn record(&mut self, location: &Location, content: &[u8], role: FileRole) {
        if !self.visited.insert(location.key()) {
            return;
        }
        let path = self.display_path(location);
        tracing::debug!(path = %path, context = %location.context(), ?role, "Fetched file");
        self.files.push(FetchedFile {
            path,
            content: content.to_vec(),
            context: location.context().clone(),
            repo_path: location.path.clone(),
            role,
        });
    }

    fn display_path(&self, location: &Location) -> String {
        location.root_path().relative_to(&self.base)
    }

    fn mark_unreachable(&mut self, name: &str, reason: &str) {
        tracing::warn!(dependency = name, reason, "Path dependency could not be retrieved");
        if self.unreachable.iter().any(|d| d.name == name) {
            return;
        }
        self.unreachable.push(UnreachableDependency {
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    fn finish(self) -> Result<Vec<FetchedFile>> {
        tracing::info!(
            files = self.files.len(),
            listings = self.client.cached_listings(),
            reads = self.client.cached_reads(),
            "Traversal finished"
        );
        if self.unreachable.is_empty() {
            Ok(self.files)
        } else {
            Err(Error::PathDependenciesNotReachable {
                dependencies: self.unreachable,
                fetched: self.files,
            })
        }
    }
}

/// The entry a listing returns when the requested path is not a directory.
fn single_entry<'e>(entries: &'e [DirectoryEntry], path: &RepoPath) -> Option<&'e DirectoryEntry> {
    match entries {
        [entry] if entry.path == *path => Some(entry),
        _ => None,
    }
}
