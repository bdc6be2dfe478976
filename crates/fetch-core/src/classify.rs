//! Mapping of collaborator failures onto the fetch error taxonomy

use crate::error::Error;

/// Classifies failures by where they happened.
///
/// Only not-found outcomes and rules violations become taxonomy errors.
/// Every other client failure is passed through as [`Error::Client`].
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// A failed listing of the requested base directory.
    pub fn listing(err: fetch_source::Error, directory: &str) -> Error {
        if err.is_not_found() {
            Error::DirectoryNotFound {
                directory: directory.to_string(),
            }
        } else {
            Error::Client(err)
        }
    }

    /// A failed read of a file the rules require.
    pub fn mandated_read(err: fetch_source::Error, file_path: &str) -> Error {
        if err.is_not_found() {
            Error::DependencyFileNotFound {
                file_path: file_path.to_string(),
            }
        } else {
            Error::Client(err)
        }
    }

    /// A rules violation found while scanning `file_path`.
    pub fn rules(err: fetch_rules::Error, file_path: &str) -> Error {
        Error::DependencyFileNotParseable {
            file_path: file_path.to_string(),
            message: err.to_string(),
        }
    }
}
