//! Fetch session configuration
//!
//! Loaded from TOML, typically a `fetch.toml` checked in beside the calling
//! tool's own settings:
//!
//! ```toml
//! ecosystem = "bundler"
//! default_ref = "main"
//! require_lockfile = true
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a [`FetchSession`](crate::FetchSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Ecosystem id looked up in the rules registry
    #[serde(default = "default_ecosystem")]
    pub ecosystem: String,
    /// Ref fetched when the source descriptor does not name one
    #[serde(default = "default_ref")]
    pub default_ref: String,
    /// Treat a missing lock file as an error
    #[serde(default)]
    pub require_lockfile: bool,
    #[serde(default = "default_follow_submodules")]
    pub follow_submodules: bool,
    /// How many directory levels below a path dependency are searched for
    /// a specification file
    #[serde(default = "default_max_search_depth")]
    pub max_search_depth: usize,
}

fn default_ecosystem() -> String {
    "bundler".to_string()
}

fn default_ref() -> String {
    "HEAD".to_string()
}

fn default_follow_submodules() -> bool {
    true
}

fn default_max_search_depth() -> usize {
    4
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ecosystem: default_ecosystem(),
            default_ref: default_ref(),
            require_lockfile: false,
            follow_submodules: default_follow_submodules(),
            max_search_depth: default_max_search_depth(),
        }
    }
}

impl FetchConfig {
    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_named(content, "<inline>")
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse_named(&content, &path.display().to_string())
    }

    fn parse_named(content: &str, origin: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse {
            origin: origin.to_string(),
            message: e.message().to_string(),
        })?;
        tracing::debug!(origin, ecosystem = %config.ecosystem, "Loaded fetch configuration");
        Ok(config)
    }

    pub fn with_ecosystem(mut self, ecosystem: impl Into<String>) -> Self {
        self.ecosystem = ecosystem.into();
        self
    }

    pub fn with_require_lockfile(mut self, require: bool) -> Self {
        self.require_lockfile = require;
        self
    }

    pub fn with_follow_submodules(mut self, follow: bool) -> Self {
        self.follow_submodules = follow;
        self
    }

    pub fn with_max_search_depth(mut self, depth: usize) -> Self {
        self.max_search_depth = depth;
        self
    }
}
