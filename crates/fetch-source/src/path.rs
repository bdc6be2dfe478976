//! Repository path handling for remote content APIs

use serde::{Deserialize, Serialize};

/// An absolute path inside a repository tree.
///
/// Paths are stored with a single leading slash and forward slashes only.
/// `.` segments are dropped and `..` segments are resolved lexically,
/// clamping at the repository root the same way `Pathname#cleanpath`
/// treats `/..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RepoPath {
    /// Internal representation always starts with `/` and never ends with one
    /// (except for the root itself)
    inner: String,
}

impl RepoPath {
    /// Create a cleaned repository path from any string.
    ///
    /// Backslashes are treated as separators; relative input is taken to be
    /// relative to the repository root.
    pub fn new(path: impl AsRef<str>) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        let normalized = path.as_ref().replace('\\', "/");
        for segment in normalized.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        let mut inner = String::with_capacity(normalized.len() + 1);
        inner.push('/');
        inner.push_str(&segments.join("/"));
        Self { inner }
    }

    /// The repository root, `/`.
    pub fn root() -> Self {
        Self {
            inner: "/".to_string(),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_root(&self) -> bool {
        self.inner == "/"
    }

    /// Join a relative path onto this one, resolving `.` and `..`.
    ///
    /// A leading slash on `relative` is ignored, so joining never escapes
    /// into a different tree.
    pub fn join(&self, relative: &str) -> Self {
        Self::new(format!("{}/{}", self.inner, relative))
    }

    /// Get the parent directory, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.inner.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => None,
        }
    }

    /// Get the final path component; `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.inner.rsplit('/').next()
        }
    }

    /// Iterate over path segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    /// Ancestors from the nearest parent up to and including the root.
    pub fn ancestors(&self) -> Vec<Self> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            ancestors.push(path);
        }
        ancestors
    }

    /// Whether `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &RepoPath) -> bool {
        if prefix.is_root() || self == prefix {
            return true;
        }
        self.inner
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// The part of `self` beneath `prefix`, without a leading slash.
    ///
    /// Returns an empty string when the paths are equal.
    pub fn strip_prefix(&self, prefix: &RepoPath) -> Option<&str> {
        if !self.starts_with(prefix) {
            return None;
        }
        if prefix.is_root() {
            return Some(self.inner.trim_start_matches('/'));
        }
        Some(self.inner[prefix.inner.len()..].trim_start_matches('/'))
    }

    /// Express `self` relative to `base`, using `..` segments when `self`
    /// lies outside of `base`.
    ///
    /// ```
    /// use fetch_source::RepoPath;
    ///
    /// let base = RepoPath::new("/Library/Homebrew/test");
    /// let file = RepoPath::new("/Library/Homebrew/constants.rb");
    /// assert_eq!(file.relative_to(&base), "../constants.rb");
    /// ```
    pub fn relative_to(&self, base: &RepoPath) -> String {
        let ours: Vec<&str> = self.segments().collect();
        let theirs: Vec<&str> = base.segments().collect();
        let shared = ours
            .iter()
            .zip(theirs.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = Vec::new();
        parts.extend(std::iter::repeat_n("..", theirs.len() - shared));
        parts.extend(&ours[shared..]);
        if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        }
    }
}

impl Default for RepoPath {
    fn default() -> Self {
        Self::root()
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for RepoPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RepoPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<RepoPath> for String {
    fn from(p: RepoPath) -> Self {
        p.inner
    }
}
