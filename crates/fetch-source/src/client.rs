//! ContentClient trait: the remote hosting API contract

use crate::error::{Error, Result};
use crate::path::RepoPath;
use crate::types::{CommitRef, DirectoryEntry, SubmoduleTarget};
use async_trait::async_trait;

/// Read-only access to repositories on a single hosting provider.
///
/// Implementations own transport concerns (pagination, timeouts, retries,
/// authentication). A missing ref, directory or file is reported as
/// [`Error::NotFound`]; every other failure is passed through untouched by
/// the fetch session.
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Provider identifier recorded in every [`SourceContext`](crate::SourceContext).
    fn provider(&self) -> &str;

    /// Resolve a branch, tag or sha to a commit.
    async fn resolve_ref(&self, repo: &str, reference: &str) -> Result<CommitRef>;

    /// List a directory at a commit.
    ///
    /// Entries come back in the provider's order. When `path` names a file or
    /// a submodule rather than a directory, the listing holds exactly that one
    /// entry, with `entry.path == path`.
    async fn list(&self, repo: &str, commit: &CommitRef, path: &RepoPath)
    -> Result<Vec<DirectoryEntry>>;

    /// Read a file's raw bytes at a commit.
    async fn read(&self, repo: &str, commit: &CommitRef, path: &RepoPath) -> Result<Vec<u8>>;

    /// Resolve where a submodule entry points.
    ///
    /// The default uses the target embedded in the listing entry.
    async fn submodule_target(&self, entry: &DirectoryEntry) -> Result<SubmoduleTarget> {
        entry.submodule.clone().ok_or_else(|| Error::Other {
            message: format!("{} is not a submodule", entry.path),
        })
    }
}
