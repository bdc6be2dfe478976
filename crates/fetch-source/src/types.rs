//! Data model shared by content clients and fetch sessions

use crate::path::RepoPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, resolved commit identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitRef(String);

impl CommitRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of an entry in a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Submodule,
}

/// Where a submodule entry points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmoduleTarget {
    /// Repository identifier on the same provider
    pub repo: String,
    /// Ref to check out; usually a commit sha recorded by the parent
    pub reference: String,
}

/// A single entry returned by [`ContentClient::list`](crate::ContentClient::list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Final path component
    pub name: String,
    /// Full path inside the listed repository
    pub path: RepoPath,
    pub kind: EntryKind,
    /// Present only for [`EntryKind::Submodule`]
    pub submodule: Option<SubmoduleTarget>,
}

impl DirectoryEntry {
    fn named(path: RepoPath, kind: EntryKind, submodule: Option<SubmoduleTarget>) -> Self {
        let name = path.file_name().unwrap_or_default().to_string();
        Self {
            name,
            path,
            kind,
            submodule,
        }
    }

    pub fn file(path: impl Into<RepoPath>) -> Self {
        Self::named(path.into(), EntryKind::File, None)
    }

    pub fn directory(path: impl Into<RepoPath>) -> Self {
        Self::named(path.into(), EntryKind::Directory, None)
    }

    pub fn submodule(
        path: impl Into<RepoPath>,
        repo: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self::named(
            path.into(),
            EntryKind::Submodule,
            Some(SubmoduleTarget {
                repo: repo.into(),
                reference: reference.into(),
            }),
        )
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_submodule(&self) -> bool {
        self.kind == EntryKind::Submodule
    }
}

/// Which repository and pinned commit a path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceContext {
    pub provider: String,
    pub repo: String,
    pub commit: CommitRef,
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.provider, self.repo, self.commit)
    }
}

/// What a caller asks a fetch session to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub provider: String,
    pub repo: String,
    /// Branch, tag or sha; the configured default ref is used when absent
    #[serde(default)]
    pub reference: Option<String>,
    /// Base directory holding the primary manifest
    #[serde(default)]
    pub directory: RepoPath,
}

impl SourceDescriptor {
    pub fn new(provider: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            repo: repo.into(),
            reference: None,
            directory: RepoPath::root(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<RepoPath>) -> Self {
        self.directory = directory.into();
        self
    }
}
