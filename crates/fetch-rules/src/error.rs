//! Error types for fetch-rules

pub type Result<T> = std::result::Result<T, Error>;

/// A rules violation found while scanning a fetched file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A reference is declared but its target cannot be determined statically
    #[error("Unsupported reference in {origin}: could not resolve `{expression}` to a path")]
    UnresolvableReference { origin: String, expression: String },

    #[error("Unresolved merge conflict markers in {origin}")]
    MergeConflict { origin: String },
}
