//! Gemfile.lock scanning

use crate::error::Result;
use crate::lockfile::ensure_no_merge_conflict;
use crate::reference::{LockfileScan, Reference, basename};

/// Section headers Bundler writes that carry no local paths.
const KNOWN_SECTIONS: [&str; 8] = [
    "GEM",
    "GIT",
    "PATH",
    "PLATFORMS",
    "DEPENDENCIES",
    "RUBY VERSION",
    "BUNDLED WITH",
    "CHECKSUMS",
];

const PLUGIN_SOURCE: &str = "PLUGIN SOURCE";

/// Collect `PATH` section remotes.
///
/// The result is authoritative: Bundler records every path source it
/// resolved, so manifest-level path declarations are not followed again.
/// A lock file using a plugin source cannot be read that way; it yields no
/// path dependencies instead of an error.
pub(crate) fn scan(content: &str, origin: &str) -> Result<LockfileScan> {
    ensure_no_merge_conflict(content, origin)?;

    let mut references: Vec<Reference> = Vec::new();
    let mut section: Option<&str> = None;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            let header = line.trim_end();
            if header == PLUGIN_SOURCE {
                tracing::warn!(origin, "Lock file uses a plugin source; ignoring its path sources");
                return Ok(LockfileScan {
                    references: Vec::new(),
                    authoritative: true,
                });
            }
            if !KNOWN_SECTIONS.contains(&header) {
                tracing::debug!(origin, header, "Skipping unknown lock file section");
            }
            section = Some(header);
            continue;
        }
        if section != Some("PATH") {
            continue;
        }
        if let Some(remote) = line.trim().strip_prefix("remote:") {
            let remote = remote.trim();
            if references.iter().any(|r| r.path == remote) {
                continue;
            }
            let name = basename(remote).to_string();
            references.push(Reference::path_dependency(name, remote, origin));
        }
    }

    Ok(LockfileScan {
        references,
        authoritative: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_outside_path_section_is_ignored() {
        let content = "GEM\n  remote: https://rubygems.org/\n  specs:\n";
        let scan = scan(content, "Gemfile.lock").unwrap();
        assert!(scan.references.is_empty());
        assert!(scan.authoritative);
    }

    #[test]
    fn test_duplicate_remotes_collapse() {
        let content = "PATH\n  remote: gems/a\n  specs:\n\nPATH\n  remote: gems/a\n  specs:\n";
        let scan = scan(content, "Gemfile.lock").unwrap();
        assert_eq!(scan.references.len(), 1);
    }
}
