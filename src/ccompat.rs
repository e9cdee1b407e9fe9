//! `extern "C"` guards for plain C headers.
//!
//! ```text
//! #pragma once            <- hoisted out of the import region, if present
//! #ifdef __cplusplus
//! extern "C" {
//! #endif
//!     ...original lines, indented...
//! #ifdef __cplusplus
//! }
//! #endif
//! ```

use crate::engine::{TagKind, TagScanner, is_pragma_once};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const OPEN_GUARD: [&str; 3] = ["#ifdef __cplusplus", "extern \"C\" {", "#endif"];
const CLOSE_GUARD: [&str; 3] = ["#ifdef __cplusplus", "}", "#endif"];
const INDENT: &str = "    ";

/// True when the header already opens with the guard (after an optional
/// `#pragma once`).
pub fn is_wrapped(text: &str) -> bool {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();
    if lines.peek().is_some_and(|l| is_pragma_once(l)) {
        lines.next();
    }
    OPEN_GUARD.iter().all(|guard| lines.next().map(str::trim) == Some(*guard))
}

/// The wrapped header, or `None` when it is already wrapped.
pub fn wrap(scanner: &TagScanner, text: &str) -> Option<String> {
    if is_wrapped(text) {
        return None;
    }

    let lines = scanner.scan(text);
    // last `#pragma once` up to and including the import region's end
    let pragma = lines
        .iter()
        .take_while(|l| l.kind != TagKind::ImportEnd)
        .filter(|l| is_pragma_once(&l.text))
        .map(|l| l.number)
        .last();

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 7);
    if pragma.is_some() {
        out.push("#pragma once".to_string());
    }
    out.extend(OPEN_GUARD.iter().map(|s| s.to_string()));
    for line in &lines {
        if Some(line.number) == pragma {
            continue;
        }
        if line.text.is_empty() {
            out.push(String::new());
        } else {
            out.push(format!("{}{}", INDENT, line.text));
        }
    }
    out.extend(CLOSE_GUARD.iter().map(|s| s.to_string()));

    let mut wrapped = out.join("\n");
    wrapped.push('\n');
    Some(wrapped)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompatReport {
    pub wrapped: Vec<PathBuf>,
    pub already_wrapped: Vec<PathBuf>,
}

/// Wrap every `*.h` below `dir`.
pub fn make_c_compatible(dir: &Path, scanner: &TagScanner, dry_run: bool) -> Result<CompatReport> {
    let mut report = CompatReport::default();

    for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "h") {
            continue;
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        match wrap(scanner, &text) {
            Some(wrapped) => {
                if !dry_run {
                    fs::write(path, wrapped)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                report.wrapped.push(path.to_path_buf());
            }
            None => report.already_wrapped.push(path.to_path_buf()),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> TagScanner {
        TagScanner::new("Conan", &[]).unwrap()
    }

    const HEADER: &str = "\
// Conan::ImportStart
#pragma once
#include <stdio.h>
// Conan::ImportEnd

int add(int a, int b);
";

    #[test]
    fn test_wrap_hoists_pragma_and_indents() {
        let out = wrap(&scanner(), HEADER).unwrap();
        assert_eq!(
            out,
            "#pragma once\n\
             #ifdef __cplusplus\n\
             extern \"C\" {\n\
             #endif\n    \
             // Conan::ImportStart\n    \
             #include <stdio.h>\n    \
             // Conan::ImportEnd\n\
             \n    \
             int add(int a, int b);\n\
             #ifdef __cplusplus\n\
             }\n\
             #endif\n"
        );
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let once = wrap(&scanner(), HEADER).unwrap();
        assert!(is_wrapped(&once));
        assert_eq!(wrap(&scanner(), &once), None);
    }

    #[test]
    fn test_pragma_after_import_region_stays_in_place() {
        let text = "// Conan::ImportStart\n// Conan::ImportEnd\n#pragma once\nint x;\n";
        let out = wrap(&scanner(), text).unwrap();
        assert!(out.starts_with("#ifdef __cplusplus\n"));
        assert!(out.contains("    #pragma once\n"));
    }

    #[test]
    fn test_spaced_pragma_is_hoisted_like_plain_one() {
        let text = "// Conan::ImportStart\n# pragma  once\n// Conan::ImportEnd\nint x;\n";
        let out = wrap(&scanner(), text).unwrap();
        assert!(out.starts_with("#pragma once\n#ifdef __cplusplus\n"));
        assert!(!out.contains("# pragma  once"));
        assert!(is_wrapped(&out));
    }

    #[test]
    fn test_make_c_compatible_only_touches_c_headers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.h"), HEADER).unwrap();
        fs::write(dir.path().join("b.hpp"), HEADER).unwrap();
        let report = make_c_compatible(dir.path(), &scanner(), false).unwrap();
        assert_eq!(report.wrapped.len(), 1);
        assert!(is_wrapped(&fs::read_to_string(dir.path().join("a.h")).unwrap()));
        assert_eq!(fs::read_to_string(dir.path().join("b.hpp")).unwrap(), HEADER);

        let again = make_c_compatible(dir.path(), &scanner(), false).unwrap();
        assert!(again.wrapped.is_empty());
        assert_eq!(again.already_wrapped.len(), 1);
    }
}
