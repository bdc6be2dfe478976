//! Rules for Python projects: requirement files, Pipenv and Poetry

use crate::error::{Error, Result};
use crate::lockfile::ensure_no_merge_conflict;
use crate::reference::{LockfileScan, Reference, basename};
use crate::rules::ManifestRules;

const MANIFESTS: [&str; 3] = ["requirements.txt", "Pipfile", "pyproject.toml"];
const SPEC_FILES: [&str; 3] = ["setup.py", "setup.cfg", "pyproject.toml"];

/// pip, Pipenv and Poetry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipRules;

impl PipRules {
    pub const ID: &'static str = "pip";

    pub fn new() -> Self {
        Self
    }
}

impl ManifestRules for PipRules {
    fn id(&self) -> &str {
        Self::ID
    }

    fn primary_manifest_candidates(&self) -> &[&'static str] {
        &MANIFESTS
    }

    fn lockfile_name_for(&self, primary: &str) -> Option<String> {
        match primary {
            "Pipfile" => Some("Pipfile.lock".to_string()),
            "pyproject.toml" => Some("poetry.lock".to_string()),
            _ => None,
        }
    }

    fn extract_references(&self, content: &str, origin: &str) -> Result<Vec<Reference>> {
        match basename(origin) {
            "Pipfile" => Ok(pipfile_references(content, origin)),
            "pyproject.toml" => Ok(pyproject_references(content, origin)),
            "setup.py" | "setup.cfg" => Ok(Vec::new()),
            _ => requirement_references(content, origin),
        }
    }

    fn scan_lockfile(&self, content: &str, origin: &str) -> Result<LockfileScan> {
        ensure_no_merge_conflict(content, origin)?;
        let references = match basename(origin) {
            "Pipfile.lock" => pipfile_lock_references(content, origin),
            "poetry.lock" => poetry_lock_references(content, origin),
            _ => Vec::new(),
        };
        Ok(LockfileScan {
            references,
            authoritative: false,
        })
    }

    fn is_path_dependency_spec(&self, filename: &str) -> bool {
        SPEC_FILES.contains(&filename)
    }

    fn specification_marker_filename(&self) -> &str {
        "PKG-INFO"
    }
}

/// Scan a requirements file (`requirements.txt`, `*.in`, constraint files).
fn requirement_references(content: &str, origin: &str) -> Result<Vec<Reference>> {
    let mut references = Vec::new();

    for raw in content.lines() {
        let line = strip_requirement_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(target) = option_value(line, &["-r", "--requirement", "-c", "--constraint"]) {
            references.push(Reference::child_manifest(
                expandable(target, line, origin)?,
                origin,
            ));
            continue;
        }

        let candidate = option_value(line, &["-e", "--editable"]).unwrap_or(line);
        if let Some(path) = local_path(candidate) {
            let path = expandable(path, line, origin)?;
            let name = basename(&path).to_string();
            references.push(Reference::path_dependency(name, path, origin));
        }
    }

    Ok(references)
}

/// Value of an option written as `-r value`, `--opt value` or `--opt=value`.
fn option_value<'a>(line: &'a str, options: &[&str]) -> Option<&'a str> {
    for option in options {
        let Some(rest) = line.strip_prefix(option) else {
            continue;
        };
        if let Some(value) = rest.strip_prefix('=') {
            return Some(value.trim());
        }
        if rest.starts_with(char::is_whitespace) {
            return Some(rest.trim());
        }
    }
    None
}

/// Local directory named by a requirement line, if it is one.
fn local_path(requirement: &str) -> Option<&str> {
    let path = requirement
        .strip_prefix("file://")
        .or_else(|| requirement.strip_prefix("file:"))
        .or_else(|| {
            (requirement.starts_with("./") || requirement.starts_with("../") || requirement == ".")
                .then_some(requirement)
        })?;
    // Drop `#egg=` fragments, extras and environment markers
    let path = path.split(['#', ';']).next().unwrap_or(path).trim();
    let path = path.split('[').next().unwrap_or(path).trim();
    (!path.is_empty()).then_some(path)
}

/// Paths built from environment variables cannot be followed.
fn expandable(path: &str, line: &str, origin: &str) -> Result<String> {
    if path.contains("${") || path.starts_with('$') {
        return Err(Error::UnresolvableReference {
            origin: origin.to_string(),
            expression: line.to_string(),
        });
    }
    Ok(path.to_string())
}

fn strip_requirement_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_toml(content: &str, origin: &str) -> Option<toml::Value> {
    match content.parse::<toml::Value>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Could not parse TOML; no references taken from it");
            None
        }
    }
}

/// `name = { path = "..." }` entries of a dependency table.
fn table_path_dependencies(table: Option<&toml::Value>, origin: &str, out: &mut Vec<Reference>) {
    let Some(table) = table.and_then(toml::Value::as_table) else {
        return;
    };
    for (name, spec) in table {
        if let Some(path) = spec.get("path").and_then(toml::Value::as_str) {
            out.push(Reference::path_dependency(name.as_str(), path, origin));
        }
    }
}

fn pipfile_references(content: &str, origin: &str) -> Vec<Reference> {
    let Some(doc) = parse_toml(content, origin) else {
        return Vec::new();
    };
    let mut references = Vec::new();
    for section in ["packages", "dev-packages"] {
        table_path_dependencies(doc.get(section), origin, &mut references);
    }
    references
}

fn pyproject_references(content: &str, origin: &str) -> Vec<Reference> {
    let Some(doc) = parse_toml(content, origin) else {
        return Vec::new();
    };
    let mut references = Vec::new();
    let tool = doc.get("tool");
    let poetry = tool.and_then(|t| t.get("poetry"));

    for section in ["dependencies", "dev-dependencies"] {
        table_path_dependencies(poetry.and_then(|p| p.get(section)), origin, &mut references);
    }
    if let Some(groups) = poetry
        .and_then(|p| p.get("group"))
        .and_then(toml::Value::as_table)
    {
        for group in groups.values() {
            table_path_dependencies(group.get("dependencies"), origin, &mut references);
        }
    }
    table_path_dependencies(
        tool.and_then(|t| t.get("uv")).and_then(|u| u.get("sources")),
        origin,
        &mut references,
    );
    references
}

fn pipfile_lock_references(content: &str, origin: &str) -> Vec<Reference> {
    let doc: serde_json::Value = match serde_json::from_str(content) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(origin, error = %e, "Could not parse Pipfile.lock; no references taken from it");
            return Vec::new();
        }
    };
    let mut references = Vec::new();
    for section in ["default", "develop"] {
        let Some(entries) = doc.get(section).and_then(serde_json::Value::as_object) else {
            continue;
        };
        for (name, entry) in entries {
            if let Some(path) = entry.get("path").and_then(serde_json::Value::as_str) {
                references.push(Reference::path_dependency(name.as_str(), path, origin));
            }
        }
    }
    references
}

fn poetry_lock_references(content: &str, origin: &str) -> Vec<Reference> {
    let Some(doc) = parse_toml(content, origin) else {
        return Vec::new();
    };
    let Some(packages) = doc.get("package").and_then(toml::Value::as_array) else {
        return Vec::new();
    };
    packages
        .iter()
        .filter_map(|package| {
            let source = package.get("source")?;
            if source.get("type").and_then(toml::Value::as_str) != Some("directory") {
                return None;
            }
            let path = source.get("url").and_then(toml::Value::as_str)?;
            let name = package
                .get("name")
                .and_then(toml::Value::as_str)
                .unwrap_or_else(|| basename(path));
            Some(Reference::path_dependency(name, path, origin))
        })
        .collect()
}
