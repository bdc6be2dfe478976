//! Checks shared by every ecosystem's lock file handling

use crate::error::{Error, Result};

const CONFLICT_MARKERS: [&str; 3] = ["<<<<<<<", "|||||||", ">>>>>>>"];

/// Whether `content` still holds unresolved merge-conflict markers.
///
/// A bare `=======` line is not enough on its own; it is common in
/// documentation and some lock formats.
pub fn has_merge_conflict(content: &str) -> bool {
    content
        .lines()
        .any(|line| CONFLICT_MARKERS.iter().any(|m| line.starts_with(m)))
}

/// Fail with [`Error::MergeConflict`] when `content` has conflict markers.
pub fn ensure_no_merge_conflict(content: &str, origin: &str) -> Result<()> {
    if has_merge_conflict(content) {
        return Err(Error::MergeConflict {
            origin: origin.to_string(),
        });
    }
    Ok(())
}
