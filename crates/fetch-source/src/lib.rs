//! Remote content access for the dependency file fetcher
//!
//! Defines the [`ContentClient`] contract a hosting provider adapter must
//! satisfy, the data model shared with fetch sessions, repository path
//! arithmetic, and the per-session [`CachingClient`].

pub mod cache;
pub mod client;
pub mod error;
pub mod path;
pub mod types;

pub use cache::CachingClient;
pub use client::ContentClient;
pub use error::{Error, Result};
pub use path::RepoPath;
pub use types::{
    CommitRef, DirectoryEntry, EntryKind, SourceContext, SourceDescriptor, SubmoduleTarget,
};
