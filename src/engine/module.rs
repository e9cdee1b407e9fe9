//! Synthesis of one module unit from a declaration/definition pair.
//!
//! ```text
//! module;
//! import <vector>;                      <- whitelisted includes
//! export module net;
//! // Conan::Escape #include "foo.hpp"   <- everything else, for review
//!
//!
//! <exporters> <attachers> <untagged>    <- declaration before definition
//! ```

use super::block::{MODULE_SEPARATOR, join};
use super::diagnostic::{Diagnostic, DiagnosticKind};
use super::export::{self, ExportOutput, ExportTag};
use super::tag::{SourceLine, TagKind, TagScanner};
use crate::error::{SpliceError, SpliceResult};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Opens the global module fragment.
pub const MODULE_INTRO: &str = "module;";

/// Standard headers that may be imported as header units.
pub const STANDARD_HEADERS: &[&str] = &[
    "algorithm",
    "array",
    "chrono",
    "cmath",
    "functional",
    "memory",
    "optional",
    "string",
    "string_view",
    "utility",
    "vector",
    "deque",
    "forward_list",
    "list",
    "map",
    "queue",
    "set",
    "stack",
    "unordered_map",
    "unordered_set",
    "atomic",
    "thread",
    "mutex",
    "future",
    "iostream",
    "fstream",
    "sstream",
    "format",
    "ranges",
    "mdspan",
    "flat_map",
    "flat_set",
];

/// Include targets eligible for rewriting into `import` declarations, stored
/// with their delimiters: `<vector>`, `"net.hpp"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: BTreeSet<String>,
}

impl Whitelist {
    pub fn new(
        std_modules: &[String],
        user_modules: &[String],
        declaration_suffix: &str,
    ) -> SpliceResult<Self> {
        let mut entries = BTreeSet::new();

        for name in std_modules {
            if !STANDARD_HEADERS.contains(&name.as_str()) {
                return Err(SpliceError::config(format!(
                    "std module '{}' is not an importable standard header",
                    name
                )));
            }
            entries.insert(format!("<{}>", name));
        }

        for name in user_modules {
            let malformed = name.trim().is_empty()
                || name.contains(|c: char| c.is_whitespace() || "<>\"".contains(c));
            if malformed {
                return Err(SpliceError::config(format!(
                    "user module name '{}' is malformed",
                    name
                )));
            }
            entries.insert(format!("\"{}.{}\"", name, declaration_suffix));
        }

        Ok(Self { entries })
    }

    pub fn contains(&self, target: &str) -> bool {
        self.entries.contains(target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One side of a pair: where it lives and, if it exists, its text.
#[derive(Debug, Clone)]
pub struct PairSide {
    pub path: PathBuf,
    pub text: Option<String>,
}

impl PairSide {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ModulePair {
    pub name: String,
    pub declaration: PairSide,
    pub definition: PairSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleUnit {
    pub name: String,
    pub imports: Vec<String>,
    pub escaped: Vec<String>,
    pub body: Vec<String>,
    pub exported: usize,
    pub attached: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleUnit {
    pub fn render(&self) -> String {
        let mut lines = vec![MODULE_INTRO.to_string()];
        lines.extend(self.imports.iter().cloned());
        lines.push(format!("export module {};", self.name));
        lines.extend(self.escaped.iter().cloned());
        if !self.body.is_empty() {
            lines.extend(std::iter::repeat_n(String::new(), MODULE_SEPARATOR));
            lines.extend(self.body.iter().cloned());
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// A file split at its import region.
#[derive(Debug, Clone, Default)]
pub struct Regions {
    /// Lines strictly between the begin and end markers.
    pub imports: Vec<SourceLine>,
    /// Lines before the region followed by everything after it.
    pub body: Vec<SourceLine>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn split_regions(lines: Vec<SourceLine>) -> Regions {
    let begin = lines.iter().position(|l| l.kind == TagKind::ImportBegin);
    let end = begin.and_then(|b| {
        lines[b..]
            .iter()
            .position(|l| l.kind == TagKind::ImportEnd)
            .map(|offset| b + offset)
    });

    let mut regions = Regions::default();
    match (begin, end) {
        (Some(b), Some(e)) => {
            for (i, line) in lines.into_iter().enumerate() {
                if i > b && i < e {
                    regions.imports.push(line);
                } else if i < b || i > e {
                    regions.body.push(line);
                }
            }
        }
        (Some(b), None) => {
            regions.diagnostics.push(Diagnostic::new(
                DiagnosticKind::MissingImportEnd,
                lines[b].number,
                "import region is never closed; the rest of the file is treated as body",
            ));
            regions.body = lines
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i != b)
                .map(|(_, l)| l)
                .collect();
        }
        _ => regions.body = lines,
    }
    regions
}

/// `<x>` or `"x"` from an `#include` line.
pub fn include_target(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix('#')?.trim_start();
    let target = rest.strip_prefix("include")?.trim();
    let closed = (target.starts_with('<') && target.ends_with('>'))
        || (target.len() > 1 && target.starts_with('"') && target.ends_with('"'));
    closed.then_some(target)
}

/// File name an include target refers to, without delimiters or directories.
pub fn target_file_name(target: &str) -> &str {
    let inner = target.trim_matches(|c| c == '<' || c == '>' || c == '"');
    inner.rsplit('/').next().unwrap_or(inner)
}

/// `#pragma once`, with any spacing after `#` and an optional trailing comment.
pub fn is_pragma_once(line: &str) -> bool {
    let Some(rest) = line.trim().strip_prefix('#') else {
        return false;
    };
    let mut words = rest.split_whitespace();
    words.next() == Some("pragma")
        && words.next() == Some("once")
        && words.next().is_none_or(|w| w.starts_with("//") || w.starts_with("/*"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportFate {
    Import(String),
    Escaped(String),
    Dropped,
}

pub struct Synthesizer<'a> {
    scanner: &'a TagScanner,
    whitelist: &'a Whitelist,
    include_untagged: bool,
}

impl<'a> Synthesizer<'a> {
    pub fn new(scanner: &'a TagScanner, whitelist: &'a Whitelist) -> Self {
        Self {
            scanner,
            whitelist,
            include_untagged: true,
        }
    }

    /// Whether blocks carrying neither tag are merged (after the attachers).
    pub fn include_untagged(mut self, yes: bool) -> Self {
        self.include_untagged = yes;
        self
    }

    pub fn synthesize(&self, pair: &ModulePair) -> SpliceResult<ModuleUnit> {
        let declaration = pair.declaration.text.as_deref().ok_or_else(|| SpliceError::MissingPair {
            module: pair.name.clone(),
            missing: "declaration",
            expected: pair.declaration.path.clone(),
        })?;
        let definition = pair.definition.text.as_deref().ok_or_else(|| SpliceError::MissingPair {
            module: pair.name.clone(),
            missing: "definition",
            expected: pair.definition.path.clone(),
        })?;

        let decl_name = pair.declaration.file_name();
        let def_name = pair.definition.file_name();
        let mut diagnostics = Vec::new();

        let decl = split_regions(self.scanner.scan(declaration));
        let def = split_regions(self.scanner.scan(definition));
        tag_diagnostics(&decl_name, &decl.diagnostics, &mut diagnostics);
        tag_diagnostics(&def_name, &def.diagnostics, &mut diagnostics);

        // the definition includes its own declaration; the unit declares it once
        let def_body: Vec<SourceLine> = def
            .body
            .into_iter()
            .filter(|l| include_target(&l.text).is_none_or(|t| target_file_name(t) != decl_name))
            .collect();

        let union: BTreeSet<String> = decl
            .imports
            .iter()
            .chain(def.imports.iter())
            .filter(|l| !l.text.trim().is_empty())
            .map(|l| l.text.trim().to_string())
            .collect();

        let self_names = [decl_name.as_str(), def_name.as_str()];
        let mut imports = BTreeSet::new();
        let mut escaped = BTreeSet::new();
        for line in &union {
            match self.rewrite_import(line, &self_names) {
                ImportFate::Import(l) => {
                    imports.insert(l);
                }
                ImportFate::Escaped(l) => {
                    escaped.insert(l);
                }
                ImportFate::Dropped => {}
            }
        }

        let decl_objects = export::process(decl.body);
        let def_objects = export::process(def_body);
        tag_diagnostics(&decl_name, &decl_objects.diagnostics, &mut diagnostics);
        tag_diagnostics(&def_name, &def_objects.diagnostics, &mut diagnostics);

        let mut groups: Vec<Option<ExportTag>> =
            vec![Some(ExportTag::Exporter), Some(ExportTag::Attacher)];
        if self.include_untagged {
            groups.push(None);
        }

        let ordered: Vec<Vec<String>> = groups
            .iter()
            .flat_map(|&tag| merged(&decl_objects, &def_objects, tag))
            .collect();
        let count = |tag| {
            decl_objects.with_tag(Some(tag)).count() + def_objects.with_tag(Some(tag)).count()
        };

        Ok(ModuleUnit {
            name: pair.name.clone(),
            imports: imports.into_iter().collect(),
            escaped: escaped.into_iter().collect(),
            exported: count(ExportTag::Exporter),
            attached: count(ExportTag::Attacher),
            body: join(ordered, MODULE_SEPARATOR),
            diagnostics,
        })
    }

    fn rewrite_import(&self, line: &str, self_names: &[&str]) -> ImportFate {
        if is_pragma_once(line) {
            return ImportFate::Dropped;
        }

        let prefix = self.scanner.escape_prefix();
        let (raw, already_escaped) = match line.strip_prefix(prefix.as_str()) {
            Some(inner) => (inner.trim(), true),
            None => (line, false),
        };

        if let Some(target) = include_target(raw) {
            if self_names.contains(&target_file_name(target)) {
                return ImportFate::Dropped;
            }
            if !already_escaped && self.whitelist.contains(target) {
                return ImportFate::Import(format!("import {};", target));
            }
        }
        ImportFate::Escaped(format!("{}{}", prefix, raw))
    }
}

fn merged(
    decl: &ExportOutput,
    def: &ExportOutput,
    tag: Option<ExportTag>,
) -> Vec<Vec<String>> {
    decl.with_tag(tag)
        .chain(def.with_tag(tag))
        .map(|b| b.lines.clone())
        .collect()
}

fn tag_diagnostics(file: &str, from: &[Diagnostic], into: &mut Vec<Diagnostic>) {
    into.extend(from.iter().map(|d| Diagnostic {
        message: format!("{}: {}", file, d.message),
        ..d.clone()
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> TagScanner {
        TagScanner::new("Conan", &[]).unwrap()
    }

    fn whitelist() -> Whitelist {
        Whitelist::new(
            &["vector".to_string(), "string".to_string()],
            &["util".to_string()],
            "hpp",
        )
        .unwrap()
    }

    fn pair(decl: Option<&str>, def: Option<&str>) -> ModulePair {
        ModulePair {
            name: "net".into(),
            declaration: PairSide {
                path: PathBuf::from("include/net.hpp"),
                text: decl.map(String::from),
            },
            definition: PairSide {
                path: PathBuf::from("src/net.cpp"),
                text: def.map(String::from),
            },
        }
    }

    const DECL: &str = "\
// Conan::ImportStart
#pragma once
#include <vector>
#include \"foo.hpp\"
#include \"net.cpp\"
// Conan::ImportEnd


/**
 * @exporter
 */
void train();


int helper();";

    const DEF: &str = "\
// Conan::ImportStart
#include \"net.hpp\"
#include <vector>
#include \"util.hpp\"
// Conan::ImportEnd


/**
 * @attacher
 */
int helper() { return 1; }


/**
 * @exporter
 */
void train() {}";

    #[test]
    fn test_whitelisted_and_escaped_imports() {
        let s = scanner();
        let w = whitelist();
        let unit = Synthesizer::new(&s, &w)
            .synthesize(&pair(Some(DECL), Some(DEF)))
            .unwrap();
        assert_eq!(unit.imports, vec!["import \"util.hpp\";", "import <vector>;"]);
        assert_eq!(unit.escaped, vec!["// Conan::Escape #include \"foo.hpp\""]);
    }

    #[test]
    fn test_self_references_never_imported() {
        let s = scanner();
        let w = whitelist();
        let unit = Synthesizer::new(&s, &w)
            .synthesize(&pair(Some(DECL), Some(DEF)))
            .unwrap();
        let rendered = unit.render();
        assert!(!rendered.contains("net.hpp"));
        assert!(!rendered.contains("net.cpp"));
        assert!(!rendered.contains("#pragma once"));
    }

    #[test]
    fn test_definition_body_self_include_removed() {
        let s = scanner();
        let w = whitelist();
        let def = "#include \"net.hpp\"\n\n\nvoid train() {}";
        let unit = Synthesizer::new(&s, &w)
            .synthesize(&pair(Some("void train();"), Some(def)))
            .unwrap();
        assert_eq!(unit.body, vec!["void train();", "", "", "void train() {}"]);
    }

    #[test]
    fn test_exporters_then_attachers_then_untagged() {
        let s = scanner();
        let w = whitelist();
        let unit = Synthesizer::new(&s, &w)
            .synthesize(&pair(Some(DECL), Some(DEF)))
            .unwrap();
        let code: Vec<&str> = unit
            .body
            .iter()
            .map(String::as_str)
            .filter(|l| !l.is_empty() && !l.starts_with("/**") && !l.starts_with(" */"))
            .collect();
        assert_eq!(
            code,
            vec![
                "export void train();",
                "export void train() {}",
                "int helper() { return 1; }",
                "int helper();",
            ]
        );
        assert_eq!(unit.exported, 2);
        assert_eq!(unit.attached, 1);
    }

    #[test]
    fn test_untagged_blocks_can_be_left_out() {
        let s = scanner();
        let w = whitelist();
        let unit = Synthesizer::new(&s, &w)
            .include_untagged(false)
            .synthesize(&pair(Some(DECL), Some(DEF)))
            .unwrap();
        assert!(!unit.body.iter().any(|l| l == "int helper();"));
    }

    #[test]
    fn test_merge_order_without_tags() {
        let s = scanner();
        let w = whitelist();
        let decl = "int a();\n\n\nint b();";
        let def = "int a() { return 0; }\n\n\nint b() { return 1; }";
        let unit = Synthesizer::new(&s, &w)
            .synthesize(&pair(Some(decl), Some(def)))
            .unwrap();
        let expected = join(
            [
                vec!["int a();".to_string()],
                vec!["int b();".to_string()],
                vec!["int a() { return 0; }".to_string()],
                vec!["int b() { return 1; }".to_string()],
            ],
            MODULE_SEPARATOR,
        );
        assert_eq!(unit.body, expected);
        assert!(!unit.body.iter().any(|l| l.starts_with("export ")));
        assert_eq!(unit.exported, 0);
    }

    #[test]
    fn test_render_layout() {
        let s = scanner();
        let w = whitelist();
        let unit = Synthesizer::new(&s, &w)
            .synthesize(&pair(Some(DECL), Some(DEF)))
            .unwrap();
        let rendered = unit.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "module;");
        assert_eq!(lines[1], "import \"util.hpp\";");
        assert_eq!(lines[2], "import <vector>;");
        assert_eq!(lines[3], "export module net;");
        assert_eq!(lines[4], "// Conan::Escape #include \"foo.hpp\"");
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "");
        assert!(rendered.ends_with("void train() {}\n") || rendered.ends_with("int helper();\n"));
    }

    #[test]
    fn test_synthesis_is_reproducible() {
        let s = scanner();
        let w = whitelist();
        let synth = Synthesizer::new(&s, &w);
        let first = synth.synthesize(&pair(Some(DECL), Some(DEF))).unwrap().render();
        let second = synth.synthesize(&pair(Some(DECL), Some(DEF))).unwrap().render();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_side_is_missing_pair_error() {
        let s = scanner();
        let w = whitelist();
        let err = Synthesizer::new(&s, &w)
            .synthesize(&pair(Some(DECL), None))
            .unwrap_err();
        match err {
            SpliceError::MissingPair { missing, expected, .. } => {
                assert_eq!(missing, "definition");
                assert_eq!(expected, PathBuf::from("src/net.cpp"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_whitelist_validation() {
        assert!(Whitelist::new(&["vectr".into()], &[], "hpp").is_err());
        assert!(Whitelist::new(&[], &["bad name".into()], "hpp").is_err());
        assert!(Whitelist::new(&[], &["<x>".into()], "hpp").is_err());
        let w = Whitelist::new(&["map".into()], &["core".into()], "hpp").unwrap();
        assert!(w.contains("<map>"));
        assert!(w.contains("\"core.hpp\""));
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn test_include_parsing() {
        assert_eq!(include_target("#include <vector>"), Some("<vector>"));
        assert_eq!(include_target("  #  include \"a/b.hpp\" "), Some("\"a/b.hpp\""));
        assert_eq!(include_target("#include MACRO"), None);
        assert_eq!(include_target("#define X"), None);
        assert_eq!(target_file_name("\"a/b.hpp\""), "b.hpp");
        assert_eq!(target_file_name("<dlib/dnn.h>"), "dnn.h");
    }

    #[test]
    fn test_split_regions_without_end_marker() {
        let lines = scanner().scan("// Conan::ImportStart\n#include <x>\nint a;");
        let r = split_regions(lines);
        assert!(r.imports.is_empty());
        assert_eq!(r.body.len(), 2);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::MissingImportEnd);
    }

    #[test]
    fn test_split_regions_keeps_preamble_in_body() {
        let lines = scanner().scan("// license\n// Conan::ImportStart\n#include <x>\n// Conan::ImportEnd\nint a;");
        let r = split_regions(lines);
        assert_eq!(r.imports.len(), 1);
        let body: Vec<_> = r.body.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(body, vec!["// license", "int a;"]);
    }

    #[test]
    fn test_pragma_once_forms() {
        assert!(is_pragma_once("#pragma once"));
        assert!(is_pragma_once("  # pragma   once"));
        assert!(is_pragma_once("#pragma once // guard"));
        assert!(!is_pragma_once("#pragma onceler"));
        assert!(!is_pragma_once("#pragma once extra"));
        assert!(!is_pragma_once("// #pragma once"));
    }
}
