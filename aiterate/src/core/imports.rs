//! Go import scanning for dependency reconciliation.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(([\s\S]*?)\)|\bimport\s+((?:[A-Za-z_.][A-Za-z0-9_]*\s+)?"[^"]+")"#)
        .expect("import regex is valid")
});

/// Collect every package path imported by the given Go sources, sorted and deduplicated.
pub fn scan_go_imports(sources: &[&str]) -> BTreeSet<String> {
    let mut imports = BTreeSet::new();
    for source in sources {
        for caps in IMPORT_RE.captures_iter(source) {
            if let Some(block) = caps.get(1) {
                imports.extend(block.as_str().lines().filter_map(extract_package_path));
            } else if let Some(single) = caps.get(2)
                && let Some(pkg) = extract_package_path(single.as_str())
            {
                imports.insert(pkg);
            }
        }
    }
    imports
}

/// Imported packages that are not part of the Go standard library.
pub fn external_go_packages(code: &str, tests: &str) -> Vec<String> {
    scan_go_imports(&[code, tests])
        .into_iter()
        .filter(|pkg| !is_standard_package(pkg))
        .collect()
}

/// Standard library paths never contain a dot in their first element
/// (`net/http`, `encoding/json`); module paths do (`github.com/...`).
pub fn is_standard_package(pkg: &str) -> bool {
    let first = pkg.split('/').next().unwrap_or(pkg);
    !first.contains('.')
}

/// Extract the quoted path from one import spec line, ignoring aliases and comments.
fn extract_package_path(line: &str) -> Option<String> {
    let line = match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    };
    let last = line.split_whitespace().last()?;
    let pkg = last.trim_matches('"');
    if pkg.is_empty() || pkg == "." || pkg == "_" {
        return None;
    }
    Some(pkg.to_string())
}
