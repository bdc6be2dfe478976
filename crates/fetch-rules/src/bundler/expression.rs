//! Static evaluation of the small subset of Ruby used to name files.
//!
//! Nothing here runs manifest code. An argument is either a string literal,
//! a `File.join`/`File.expand_path` over resolvable parts, `__dir__`,
//! `__FILE__`, or a local variable bound earlier in the same file to one
//! of those. Everything else is either skipped ([`Resolved::Dynamic`]) or
//! reported ([`Resolved::Unresolvable`]).

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Bound on nested variable lookups, which also breaks `a = b; b = a` loops.
const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolved {
    /// Path relative to the directory of the scanned file
    Path(String),
    /// A method call or construct that is not followed
    Dynamic,
    /// Depends on a variable, interpolation or environment lookup with no
    /// static value
    Unresolvable,
}

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_]\w*)\s*=\s*([^=~\s].*?)\s*$").expect("Invalid assignment regex")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("Invalid identifier regex"));

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{([^}]*)\}").expect("Invalid interpolation regex"));

static BLOCK_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(do(\s*\|[^|]*\|)?|\{)\s*$").expect("Invalid block opener regex")
});

/// Local variable assignments seen so far in a file.
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    /// Record `line` if it is a plain assignment. Returns whether it was.
    pub(crate) fn record(&mut self, line: &str) -> bool {
        let Some(caps) = ASSIGNMENT.captures(line) else {
            return false;
        };
        self.values.insert(caps[1].to_string(), caps[2].to_string());
        true
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Resolve a Ruby expression naming a path.
///
/// `file_name` is the basename of the file being scanned, which is what
/// `__FILE__` expands to relative to that file's directory.
pub(crate) fn resolve(expr: &str, bindings: &Bindings, file_name: &str) -> Resolved {
    resolve_at(expr.trim(), bindings, file_name, 0)
}

fn resolve_at(expr: &str, bindings: &Bindings, file_name: &str, depth: usize) -> Resolved {
    if depth > MAX_DEPTH {
        return Resolved::Unresolvable;
    }
    let expr = expr.trim();

    if let Some((quote, body)) = string_literal(expr) {
        if quote == '\'' {
            return Resolved::Path(body.to_string());
        }
        return interpolate(body, bindings, file_name, depth);
    }
    match expr {
        "__dir__" => return Resolved::Path(".".to_string()),
        "__FILE__" => return Resolved::Path(file_name.to_string()),
        _ => {}
    }
    if expr.starts_with("ENV[") || expr.starts_with("ENV.") {
        return Resolved::Unresolvable;
    }
    if IDENTIFIER.is_match(expr) {
        return match bindings.get(expr) {
            Some(value) => match resolve_at(value, bindings, file_name, depth + 1) {
                Resolved::Path(path) => Resolved::Path(path),
                _ => Resolved::Unresolvable,
            },
            None => Resolved::Unresolvable,
        };
    }
    if let Some(args) = method_arguments(expr, "File.join") {
        let mut parts = Vec::with_capacity(args.len());
        for arg in &args {
            match resolve_at(arg, bindings, file_name, depth + 1) {
                Resolved::Path(part) => parts.push(part),
                other => return other,
            }
        }
        return Resolved::Path(join_parts(&parts));
    }
    if let Some(args) = method_arguments(expr, "File.expand_path") {
        let target = match args.first() {
            Some(arg) => resolve_at(arg, bindings, file_name, depth + 1),
            None => return Resolved::Dynamic,
        };
        let Resolved::Path(target) = target else {
            return target;
        };
        return match args.get(1) {
            None => Resolved::Path(target),
            Some(base) => match resolve_at(base, bindings, file_name, depth + 1) {
                Resolved::Path(_) if target.starts_with('/') => Resolved::Path(target),
                Resolved::Path(base) => Resolved::Path(join_parts(&[base, target])),
                other => other,
            },
        };
    }
    Resolved::Dynamic
}

fn interpolate(body: &str, bindings: &Bindings, file_name: &str, depth: usize) -> Resolved {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for caps in INTERPOLATION.captures_iter(body) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        match resolve_at(&caps[1], bindings, file_name, depth + 1) {
            Resolved::Path(value) => {
                out.push_str(&body[last..whole.start()]);
                out.push_str(&value);
                last = whole.end();
            }
            _ => return Resolved::Unresolvable,
        }
    }
    out.push_str(&body[last..]);
    Resolved::Path(out)
}

fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim_end_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a quoted literal into its quote character and body.
fn string_literal(expr: &str) -> Option<(char, &str)> {
    let quote = expr.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let body = expr.strip_prefix(quote)?.strip_suffix(quote)?;
    if body.contains(quote) {
        return None;
    }
    Some((quote, body))
}

/// Arguments of `name(...)` or `name ...` when `expr` is exactly that call.
fn method_arguments(expr: &str, name: &str) -> Option<Vec<String>> {
    call_arguments(expr.strip_prefix(name)?)
}

/// Parse what follows a method name into its top-level arguments.
///
/// Accepts `(a, b)` and the paren-less `a, b` form, dropping a trailing
/// `do`/`{` block opener. Returns `None` when `rest` is not an argument
/// list (for example `.method` chaining or an operator).
pub(crate) fn call_arguments(rest: &str) -> Option<Vec<String>> {
    if let Some(open) = rest.strip_prefix('(') {
        let close = matching_paren(open)?;
        return Some(split_arguments(&open[..close]));
    }
    if rest.is_empty() {
        return Some(Vec::new());
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = BLOCK_OPENER.replace(rest, "");
    let rest = rest.trim();
    if rest.starts_with('=') {
        return None;
    }
    Some(split_arguments(rest))
}

/// Index of the `)` closing an already-consumed `(`.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')') if depth == 0 => return Some(idx),
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Split on commas outside quotes and brackets.
pub(crate) fn split_arguments(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                args.push(s[start..idx].trim().to_string());
                start = idx + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        args.push(tail.to_string());
    }
    args
}

/// Drop a trailing `#` comment that is not inside a string literal.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (idx, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => return &line[..idx],
            _ => {}
        }
    }
    line
}
