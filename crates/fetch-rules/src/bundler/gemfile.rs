//! Reference scanning for Gemfiles, gemspecs and required Ruby files

use super::expression::{self, Bindings, Resolved};
use crate::error::{Error, Result};
use crate::reference::{Reference, basename};
use regex::Regex;
use std::sync::LazyLock;

static METHOD_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(eval_gemfile|require_relative|gemspec|gem|path)\b(.*)$")
        .expect("Invalid method call regex")
});

/// Keyword argument naming a local directory, in either hash syntax.
static PATH_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:path:|:path\s*=>)\s*(.+)$").expect("Invalid path option regex")
});

/// Version files some Gemfiles read with `File.read`.
const SUPPORT_FILES: [&str; 2] = [".ruby-version", ".tool-versions"];

/// Whether a file may declare gems and child Gemfiles, as opposed to plain
/// Ruby where only `require_relative` is followed.
fn is_gemfile_like(file_name: &str) -> bool {
    if file_name.ends_with(".gemspec") {
        return false;
    }
    file_name == "gems.rb" || !file_name.ends_with(".rb")
}

/// Scan Ruby source for file and directory references.
pub(crate) fn scan(content: &str, origin: &str) -> Result<Vec<Reference>> {
    let file_name = basename(origin);
    let gemfile_like = is_gemfile_like(file_name);
    let mut bindings = Bindings::default();
    let mut references = Vec::new();

    for raw in content.lines() {
        let line = expression::strip_comment(raw);
        if line.trim().is_empty() || bindings.record(line) {
            continue;
        }
        let Some(caps) = METHOD_CALL.captures(line) else {
            continue;
        };
        let Some(args) = expression::call_arguments(&caps[2]) else {
            continue;
        };
        let method = &caps[1];

        match method {
            "require_relative" => {
                let Some(arg) = args.first() else { continue };
                match expression::resolve(arg, &bindings, file_name) {
                    Resolved::Path(path) => {
                        references.push(Reference::child_manifest(with_rb_extension(path), origin))
                    }
                    _ => tracing::debug!(origin, expression = %arg, "Skipping dynamic require_relative"),
                }
            }
            _ if !gemfile_like => {}
            "eval_gemfile" => {
                let Some(arg) = args.first() else { continue };
                if let Some(path) = declared_path(arg, &bindings, file_name, origin)? {
                    references.push(Reference::child_manifest(path, origin));
                }
            }
            "gem" => {
                let Some(expr) = args.iter().skip(1).find_map(|a| path_option(a)) else {
                    continue;
                };
                if let Some(path) = declared_path(expr, &bindings, file_name, origin)? {
                    let name = gem_name(args.first(), &path);
                    references.push(Reference::path_dependency(name, path, origin));
                }
            }
            "gemspec" => {
                let Some(expr) = args.iter().find_map(|a| path_option(a)) else {
                    continue;
                };
                if let Some(path) = declared_path(expr, &bindings, file_name, origin)? {
                    let name = basename(&path).to_string();
                    references.push(Reference::path_dependency(name, path, origin));
                }
            }
            "path" => {
                // `path "dir" do ... end` sources every gem in the block from `dir`
                let Some(arg) = args.first() else { continue };
                if let Resolved::Path(path) = expression::resolve(arg, &bindings, file_name) {
                    let name = basename(&path).to_string();
                    references.push(Reference::path_dependency(name, path, origin));
                }
            }
            _ => {}
        }
    }

    if gemfile_like {
        for support in SUPPORT_FILES {
            if content.contains(support) {
                references.push(Reference::support_file(support, origin));
            }
        }
    }

    Ok(references)
}

/// Resolve an argument that is known to name a file or directory.
fn declared_path(
    expr: &str,
    bindings: &Bindings,
    file_name: &str,
    origin: &str,
) -> Result<Option<String>> {
    match expression::resolve(expr, bindings, file_name) {
        Resolved::Path(path) => Ok(Some(path)),
        Resolved::Dynamic => {
            tracing::debug!(origin, expression = expr, "Skipping dynamic path expression");
            Ok(None)
        }
        Resolved::Unresolvable => Err(Error::UnresolvableReference {
            origin: origin.to_string(),
            expression: expr.to_string(),
        }),
    }
}

fn path_option(arg: &str) -> Option<&str> {
    PATH_OPTION
        .captures(arg)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Gem name from the first argument, falling back to the directory name.
fn gem_name(first: Option<&String>, path: &str) -> String {
    first
        .map(|arg| arg.trim_matches(|c| c == '"' || c == '\''))
        .filter(|name| !name.is_empty() && !name.contains(['#', ' ']))
        .unwrap_or_else(|| basename(path))
        .to_string()
}

fn with_rb_extension(path: String) -> String {
    if basename(&path).contains('.') {
        path
    } else {
        format!("{}.rb", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceKind;

    #[test]
    fn test_gemfile_like() {
        assert!(is_gemfile_like("Gemfile"));
        assert!(is_gemfile_like("gems.rb"));
        assert!(is_gemfile_like("Gemfile.common"));
        assert!(!is_gemfile_like("constants.rb"));
        assert!(!is_gemfile_like("bump.gemspec"));
    }

    #[test]
    fn test_gem_name_prefers_first_argument() {
        assert_eq!(gem_name(Some(&"\"rails\"".to_string()), "vendor/x"), "rails");
        assert_eq!(gem_name(None, "vendor/x"), "x");
    }

    #[test]
    fn test_require_relative_adds_extension() {
        let refs = scan("require_relative \"../constants\"\n", "lib/bump.gemspec").unwrap();
        assert_eq!(refs, vec![Reference::child_manifest("../constants.rb", "lib/bump.gemspec")]);
    }

    #[test]
    fn test_plain_ruby_ignores_gem_declarations() {
        let refs = scan("gem \"x\", path: \"vendor/x\"\n", "lib/setup.rb").unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn test_hash_rocket_path_option() {
        let refs = scan("gem 'x', :path => 'vendor/x'\n", "Gemfile").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(
            refs[0].kind,
            ReferenceKind::PathDependency {
                name: "x".to_string()
            }
        );
        assert_eq!(refs[0].path, "vendor/x");
    }
}
