//! Static capability scan of snippet source text.
//!
//! Finds `import` / `from … import` acquisitions before a worker is
//! spawned, so a denied capability costs nothing and deterministically
//! aborts the attempt. The scan is a line-level heuristic: triple-quoted
//! blocks and trailing comments are skipped, but dynamically constructed
//! acquisitions are invisible here by design — the in-worker capability
//! gate catches those at runtime with the same decision table.

use crate::registry::{AllowListRegistry, Decision};

/// Returns capability acquisitions in source order.
///
/// `import a.b as c, d` yields `["a.b", "d"]`; `from x.y import z`
/// yields `["x.y"]`. Relative imports (`from . import z`) name no
/// external capability and are skipped.
#[must_use]
pub fn scan_acquisitions(source: &str) -> Vec<String> {
    let mut acquisitions = Vec::new();
    let mut in_triple: Option<&str> = None;

    for line in source.lines() {
        let mut rest = line;
        if let Some(delim) = in_triple {
            match rest.find(delim) {
                Some(pos) => {
                    rest = &rest[pos + delim.len()..];
                    in_triple = None;
                }
                None => continue,
            }
        }

        let (code, opened) = strip_noise(rest);
        in_triple = opened;

        let trimmed = code.trim();
        if let Some(spec) = trimmed.strip_prefix("import ") {
            for part in spec.split(',') {
                if let Some(name) = module_name(part) {
                    acquisitions.push(name);
                }
            }
        } else if let Some(spec) = trimmed.strip_prefix("from ") {
            if let Some((module, _)) = spec.split_once(" import ") {
                if let Some(name) = module_name(module) {
                    acquisitions.push(name);
                }
            }
        }
    }
    acquisitions
}

/// Consults the registry for every scanned acquisition and returns the
/// first denied capability, if any. A `Some` return means the attempt
/// must abort before any snippet statement executes.
#[must_use]
pub fn first_denied(source: &str, registry: &AllowListRegistry) -> Option<String> {
    scan_acquisitions(source)
        .into_iter()
        .find(|name| registry.authorize(name) == Decision::Denied)
}

/// Cuts a line at the first comment or single-quoted string start and
/// reports whether a triple-quoted block opens on it.
///
/// Anything inside quotes cannot be an import statement prefix, so
/// cutting at the first quote is safe for this scanner's purpose.
fn strip_noise(line: &str) -> (&str, Option<&'static str>) {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'#' => return (&line[..i], None),
            b'"' | b'\'' => {
                let delim: &'static str = if b == b'"' { "\"\"\"" } else { "'''" };
                if line[i..].starts_with(delim) {
                    // Triple quote: block continues past this line unless
                    // it also closes here.
                    let after = &line[i + delim.len()..];
                    if after.contains(delim) {
                        return (&line[..i], None);
                    }
                    return (&line[..i], Some(delim));
                }
                return (&line[..i], None);
            }
            _ => {}
        }
    }
    (line, None)
}

/// Extracts the dotted module path from one import segment, dropping an
/// `as` alias. Returns `None` for relative imports and empty segments.
fn module_name(segment: &str) -> Option<String> {
    let name = segment.trim().split_whitespace().next()?;
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    valid.then(|| name.to_owned())
}
