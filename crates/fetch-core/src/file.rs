//! Fetched files and unreachable dependency records

use fetch_source::{RepoPath, SourceContext};
use serde::Serialize;
use std::borrow::Cow;

/// Why a file is part of the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    /// The primary manifest found in the base directory
    Manifest,
    Lockfile,
    /// A manifest or source file pulled in by another file
    ChildManifest,
    /// A package specification (gemspec, setup.py, marker file)
    Specification,
    /// An optional auxiliary file such as `.ruby-version`
    Support,
}

/// A file returned by a fetch session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedFile {
    /// Path relative to the requested base directory; may start with `../`
    pub path: String,
    pub content: Vec<u8>,
    /// Repository and commit the content was read from
    pub context: SourceContext,
    /// Path inside the repository named by `context`
    pub repo_path: RepoPath,
    pub role: FileRole,
}

impl FetchedFile {
    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.repo_path.file_name().unwrap_or(&self.path)
    }

    /// Content as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// A path dependency whose specification could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreachableDependency {
    pub name: String,
    pub reason: String,
}
