//! Error types for fetch-core

use crate::file::{FetchedFile, UnreachableDependency};
use std::path::PathBuf;

/// Result type for fetch-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a fetch session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested base directory does not exist or is a file
    #[error("Directory not found: {directory}")]
    DirectoryNotFound { directory: String },

    /// A file the rules require is missing
    #[error("Dependency file not found: {file_path}")]
    DependencyFileNotFound { file_path: String },

    #[error("Dependency file not parseable: {file_path}: {message}")]
    DependencyFileNotParseable { file_path: String, message: String },

    /// Raised once traversal has finished; carries everything that was fetched
    #[error("{}", unreachable_message(.dependencies))]
    PathDependenciesNotReachable {
        dependencies: Vec<UnreachableDependency>,
        fetched: Vec<FetchedFile>,
    },

    /// Authentication, rate limiting and transport failures, unchanged
    #[error(transparent)]
    Client(#[from] fetch_source::Error),

    #[error("Failed to read configuration {path}: {message}")]
    ConfigRead { path: PathBuf, message: String },

    #[error("Invalid configuration in {origin}: {message}")]
    ConfigParse { origin: String, message: String },

    #[error("Unknown ecosystem: {id}")]
    UnknownEcosystem { id: String },
}

fn unreachable_message(dependencies: &[UnreachableDependency]) -> String {
    let mut message =
        String::from("The following path based dependencies could not be retrieved:");
    for dependency in dependencies {
        message.push_str("\n* ");
        message.push_str(&dependency.name);
    }
    message
}

impl Error {
    fn file_path(&self) -> Option<&str> {
        match self {
            Error::DependencyFileNotFound { file_path }
            | Error::DependencyFileNotParseable { file_path, .. } => Some(file_path.as_str()),
            _ => None,
        }
    }

    /// Name of the missing or unparseable file.
    pub fn file_name(&self) -> Option<&str> {
        self.file_path().and_then(|path| path.rsplit('/').next())
    }

    /// Directory of the offending file, or the missing directory itself.
    pub fn directory(&self) -> Option<&str> {
        if let Error::DirectoryNotFound { directory } = self {
            return Some(directory.as_str());
        }
        let path = self.file_path()?;
        match path.rfind('/') {
            Some(0) => Some("/"),
            Some(idx) => Some(&path[..idx]),
            None => Some("."),
        }
    }

    /// Files fetched before a deferred failure.
    pub fn fetched_files(&self) -> Option<&[FetchedFile]> {
        match self {
            Error::PathDependenciesNotReachable { fetched, .. } => Some(fetched.as_slice()),
            _ => None,
        }
    }

    /// Whether the error is a provider failure rather than a property of
    /// the repository's contents.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Client(_))
    }
}
