//! Recursive dependency file fetching over a remote content API
//!
//! Given a repository, a ref and a directory, a [`FetchSession`] locates the
//! primary manifest, its lock file, and every file those reference: child
//! manifests, local path dependencies' specifications and files inside git
//! submodules. Which files matter is decided by a
//! [`ManifestRules`](fetch_rules::ManifestRules) implementation; how they are
//! read is decided by a [`ContentClient`](fetch_source::ContentClient).
//!
//! ## Modules
//!
//! - [`session`]: the traversal engine
//! - [`classify`]: maps client failures onto [`Error`]
//! - [`config`]: TOML-backed [`FetchConfig`]
//! - [`file`]: [`FetchedFile`] and [`UnreachableDependency`]
//! - [`logging`]: tracing subscriber setup for embedding binaries and tests

pub mod classify;
pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod session;

pub use classify::ErrorClassifier;
pub use config::FetchConfig;
pub use error::{Error, Result};
pub use file::{FetchedFile, FileRole, UnreachableDependency};
pub use session::FetchSession;
