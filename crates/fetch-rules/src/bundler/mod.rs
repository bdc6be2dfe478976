//! Rules for Ruby projects managed with Bundler

mod expression;
mod gemfile;
mod lockfile;

use crate::error::Result;
use crate::reference::{LockfileScan, Reference};
use crate::rules::ManifestRules;

const MANIFESTS: [&str; 2] = ["Gemfile", "gems.rb"];

/// Bundler: `Gemfile`/`gems.rb` with `Gemfile.lock`/`gems.locked`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundlerRules;

impl BundlerRules {
    pub const ID: &'static str = "bundler";

    pub fn new() -> Self {
        Self
    }
}

impl ManifestRules for BundlerRules {
    fn id(&self) -> &str {
        Self::ID
    }

    fn primary_manifest_candidates(&self) -> &[&'static str] {
        &MANIFESTS
    }

    fn lockfile_name_for(&self, primary: &str) -> Option<String> {
        match primary {
            "Gemfile" => Some("Gemfile.lock".to_string()),
            "gems.rb" => Some("gems.locked".to_string()),
            _ => None,
        }
    }

    fn extract_references(&self, content: &str, origin: &str) -> Result<Vec<Reference>> {
        gemfile::scan(content, origin)
    }

    fn scan_lockfile(&self, content: &str, origin: &str) -> Result<LockfileScan> {
        lockfile::scan(content, origin)
    }

    fn is_path_dependency_spec(&self, filename: &str) -> bool {
        filename.ends_with(".gemspec") && filename.len() > ".gemspec".len()
    }

    fn specification_marker_filename(&self) -> &str {
        ".specification"
    }
}
