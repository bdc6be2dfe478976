//! Per-session memoization in front of a [`ContentClient`]
//!
//! Every ref resolution, listing and read is keyed and cached for the life
//! of one [`CachingClient`]. Concurrent callers for the same key share a
//! single in-flight request: the first caller drives it, later callers
//! await the same [`OnceCell`]. Not-found outcomes are cached too, so a
//! missing directory reached through two reference chains is requested once.

use crate::client::ContentClient;
use crate::error::Result;
use crate::path::RepoPath;
use crate::types::{CommitRef, DirectoryEntry, SourceContext, SubmoduleTarget};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type Slot<T> = Arc<OnceCell<Result<T>>>;

/// Map of keys to shared once-initialised results.
struct SlotMap<K, T> {
    slots: Mutex<HashMap<K, Slot<T>>>,
}

impl<K: Eq + Hash, T> SlotMap<K, T> {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: K) -> Slot<T> {
        // Entries are only ever inserted, so a poisoned map is still usable.
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key).or_default().clone()
    }

    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Caching adapter scoped to one fetch session.
///
/// Created fresh for every session and dropped with it; nothing is shared
/// across sessions.
pub struct CachingClient {
    inner: Arc<dyn ContentClient>,
    commits: SlotMap<(String, String), CommitRef>,
    listings: SlotMap<(SourceContext, RepoPath), Arc<Vec<DirectoryEntry>>>,
    contents: SlotMap<(SourceContext, RepoPath), Arc<Vec<u8>>>,
}

impl CachingClient {
    pub fn new(inner: Arc<dyn ContentClient>) -> Self {
        Self {
            inner,
            commits: SlotMap::new(),
            listings: SlotMap::new(),
            contents: SlotMap::new(),
        }
    }

    pub fn provider(&self) -> &str {
        self.inner.provider()
    }

    /// Resolve `reference` in `repo` once per session.
    pub async fn resolve_ref(&self, repo: &str, reference: &str) -> Result<CommitRef> {
        let slot = self
            .commits
            .slot((repo.to_string(), reference.to_string()));
        slot.get_or_init(|| async {
            tracing::debug!(repo, reference, "Resolving ref");
            self.inner.resolve_ref(repo, reference).await
        })
        .await
        .clone()
    }

    /// Pin `reference` in `repo` and build the matching source context.
    pub async fn open_context(&self, repo: &str, reference: &str) -> Result<SourceContext> {
        let commit = self.resolve_ref(repo, reference).await?;
        Ok(SourceContext {
            provider: self.provider().to_string(),
            repo: repo.to_string(),
            commit,
        })
    }

    pub async fn list(
        &self,
        context: &SourceContext,
        path: &RepoPath,
    ) -> Result<Arc<Vec<DirectoryEntry>>> {
        let slot = self.listings.slot((context.clone(), path.clone()));
        slot.get_or_init(|| async {
            tracing::debug!(%context, %path, "Listing directory");
            self.inner
                .list(&context.repo, &context.commit, path)
                .await
                .map(Arc::new)
        })
        .await
        .clone()
    }

    pub async fn read(&self, context: &SourceContext, path: &RepoPath) -> Result<Arc<Vec<u8>>> {
        let slot = self.contents.slot((context.clone(), path.clone()));
        slot.get_or_init(|| async {
            tracing::debug!(%context, %path, "Reading file");
            self.inner
                .read(&context.repo, &context.commit, path)
                .await
                .map(Arc::new)
        })
        .await
        .clone()
    }

    /// Submodule pointers are not cached; the commit they pin is.
    pub async fn submodule_target(&self, entry: &DirectoryEntry) -> Result<SubmoduleTarget> {
        self.inner.submodule_target(entry).await
    }

    /// Number of distinct (context, path) listings requested so far.
    pub fn cached_listings(&self) -> usize {
        self.listings.len()
    }

    /// Number of distinct (context, path) reads requested so far.
    pub fn cached_reads(&self) -> usize {
        self.contents.len()
    }
}

impl std::fmt::Debug for CachingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingClient")
            .field("provider", &self.provider())
            .field("listings", &self.cached_listings())
            .field("reads", &self.cached_reads())
            .finish()
    }
}
