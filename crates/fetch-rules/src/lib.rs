//! Per-ecosystem manifest rules
//!
//! A [`ManifestRules`] implementation knows which files make up a project
//! in one package ecosystem: the primary manifest names, the lock file that
//! goes with each, and how to scan file contents for references to other
//! files and local path dependencies. Scanning is purely textual.
//!
//! Built-in ecosystems:
//!
//! - [`BundlerRules`]: `Gemfile`/`gems.rb`, `eval_gemfile`, `require_relative`,
//!   `path:` gems and `Gemfile.lock` `PATH` sections
//! - [`PipRules`]: requirement files, `Pipfile` and `pyproject.toml`
//!
//! # Example
//!
//! ```rust
//! use fetch_rules::{ManifestRules, RulesRegistry};
//!
//! let registry = RulesRegistry::with_builtins();
//! let bundler = registry.get("bundler").unwrap();
//! assert_eq!(bundler.lockfile_name_for("Gemfile").as_deref(), Some("Gemfile.lock"));
//!
//! let refs = bundler
//!     .extract_references("eval_gemfile \"backend/Gemfile\"\n", "Gemfile")
//!     .unwrap();
//! assert_eq!(refs[0].path, "backend/Gemfile");
//! ```

pub mod bundler;
pub mod error;
pub mod lockfile;
pub mod pip;
pub mod reference;
pub mod registry;
pub mod rules;

pub use bundler::BundlerRules;
pub use error::{Error, Result};
pub use lockfile::has_merge_conflict;
pub use pip::PipRules;
pub use reference::{LockfileScan, Reference, ReferenceKind, basename};
pub use registry::RulesRegistry;
pub use rules::ManifestRules;
