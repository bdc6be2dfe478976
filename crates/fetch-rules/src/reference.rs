//! References discovered by scanning manifests and lock files

/// What kind of file or directory a reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A file that must exist and is itself scanned (child manifests,
    /// `require_relative` targets, `-r` requirement files)
    ChildManifest,
    /// A local directory expected to hold a package specification
    PathDependency { name: String },
    /// An optional auxiliary file; never scanned, absence is not an error
    SupportFile,
}

/// A reference request produced by [`ManifestRules`](crate::ManifestRules).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Raw path, relative to the directory of `origin`
    pub path: String,
    /// Path of the file the reference was found in
    pub origin: String,
}

impl Reference {
    pub fn child_manifest(path: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::ChildManifest,
            path: path.into(),
            origin: origin.into(),
        }
    }

    pub fn path_dependency(
        name: impl Into<String>,
        path: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            kind: ReferenceKind::PathDependency { name: name.into() },
            path: path.into(),
            origin: origin.into(),
        }
    }

    pub fn support_file(path: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::SupportFile,
            path: path.into(),
            origin: origin.into(),
        }
    }

    pub fn is_path_dependency(&self) -> bool {
        matches!(self.kind, ReferenceKind::PathDependency { .. })
    }
}

/// Outcome of scanning a lock file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockfileScan {
    pub references: Vec<Reference>,
    /// When set, path dependencies come from the lock file alone and
    /// path-dependency references found in manifests are ignored.
    pub authoritative: bool,
}

/// Final segment of a `/`-separated path, ignoring trailing slashes and
/// `.` segments. Falls back to the whole input when nothing is left.
pub fn basename(path: &str) -> &str {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .next_back()
        .unwrap_or(path)
}
