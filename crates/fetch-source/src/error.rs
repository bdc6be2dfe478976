//! Error types for fetch-source

/// Result type for content client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`ContentClient`](crate::ContentClient).
///
/// Only [`Error::NotFound`] carries meaning for dependency resolution; every
/// other variant must reach the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    #[error("Rate limit exceeded{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Transient failure: {message}")]
    Transient { message: String },

    #[error("Content client error: {message}")]
    Other { message: String },
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(", retry after {}s", secs),
        None => String::new(),
    }
}

impl Error {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
