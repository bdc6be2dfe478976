//! The ManifestRules strategy trait

use crate::error::Result;
use crate::lockfile;
use crate::reference::{LockfileScan, Reference};

/// Per-ecosystem knowledge consulted by a fetch session.
///
/// Implementations are pure text scanners: they never touch the network and
/// never evaluate manifest code. Anything that cannot be statically resolved
/// is skipped, except a reference that is provably declared but whose target
/// cannot be determined, which is reported as
/// [`Error::UnresolvableReference`](crate::Error::UnresolvableReference).
pub trait ManifestRules: Send + Sync {
    /// Ecosystem identifier used for registry lookup.
    fn id(&self) -> &str;

    /// Primary manifest names in preference order.
    fn primary_manifest_candidates(&self) -> &[&'static str];

    /// Companion lock file for a primary manifest, if the ecosystem has one.
    fn lockfile_name_for(&self, primary: &str) -> Option<String>;

    /// Whether the manifest content proves its lock file must exist.
    fn lockfile_required(&self, _manifest: &str) -> bool {
        false
    }

    /// Scan a fetched file for references to other files or directories.
    ///
    /// `origin` is the file's path as reported to the caller; the returned
    /// references carry paths relative to its directory.
    fn extract_references(&self, content: &str, origin: &str) -> Result<Vec<Reference>>;

    /// Validate a fetched lock file and collect lock-derived references.
    fn scan_lockfile(&self, content: &str, origin: &str) -> Result<LockfileScan> {
        lockfile::ensure_no_merge_conflict(content, origin)?;
        Ok(LockfileScan::default())
    }

    /// Whether `filename` is a package specification inside a path dependency.
    fn is_path_dependency_spec(&self, filename: &str) -> bool;

    /// Whether `filename` is a specification fetched from the base directory
    /// alongside the primary manifest.
    fn is_beside_manifest_spec(&self, filename: &str) -> bool {
        self.is_path_dependency_spec(filename)
    }

    /// Sentinel file accepted when a path dependency has no specification.
    fn specification_marker_filename(&self) -> &str;
}
