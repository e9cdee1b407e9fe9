//! `@since` gating of documentation blocks.

use super::block::{Block, DOC_SEPARATOR, join};
use super::diagnostic::{Diagnostic, DiagnosticKind};
use super::tag::{CommentOpener, SourceLine};
use semver::Version;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Opens the doxygen group after a file-header block.
pub const GROUP_OPEN: &str = "//! @{";
/// Closes it once, after the last block of the file.
pub const GROUP_CLOSE: &str = "//! @}";

const SINCE: &str = "@since ";

/// A dotted documentation version of 1 to 3 non-negative integers. Missing
/// trailing components are 0, so `1.2` == `1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocVersion(Version);

impl DocVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    pub fn as_semver(&self) -> &Version {
        &self.0
    }
}

impl FromStr for DocVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() > 3 {
            return Err(format!("'{}' has more than 3 components", s));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("'{}' is not a dotted list of integers", s));
            }
            *slot = part
                .parse()
                .map_err(|e| format!("'{}' is out of range: {}", s, e))?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for DocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fate", rename_all = "kebab-case")]
pub enum BlockFate {
    FileHeader,
    Kept { since: String },
    DroppedForVersion { since: String },
    Unversioned,
}

#[derive(Debug, Clone, Default)]
pub struct GateOutput {
    pub lines: Vec<String>,
    /// First `@since` of the file-header block, when it parses.
    pub file_version: Option<DocVersion>,
    /// Fate of each input block, keyed by the block's first line number.
    pub fates: Vec<(usize, BlockFate)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GateOutput {
    pub fn dropped(&self) -> usize {
        self.fates
            .iter()
            .filter(|(_, fate)| matches!(fate, BlockFate::DroppedForVersion { .. }))
            .count()
    }
}

/// True when a file declaring `file_version` must be left out of the `target`
/// tree entirely.
pub fn excludes_file(file_version: Option<&DocVersion>, target: &DocVersion) -> bool {
    file_version.is_some_and(|v| v > target)
}

pub fn gate(blocks: &[Block], target: &DocVersion) -> GateOutput {
    let mut out = GateOutput::default();
    let mut kept: Vec<Vec<String>> = Vec::new();
    let mut group_opened = false;

    for block in blocks {
        let (fate, mut texts) = judge(block, target, &mut out);
        if fate == BlockFate::FileHeader {
            texts.push(GROUP_OPEN.to_string());
            group_opened = true;
        }
        if !matches!(fate, BlockFate::DroppedForVersion { .. }) {
            kept.push(texts);
        }
        out.fates.push((block.first_line(), fate));
    }

    if group_opened {
        kept.push(vec![GROUP_CLOSE.to_string()]);
    }

    out.lines = join(kept, DOC_SEPARATOR);
    out
}

fn judge(block: &Block, target: &DocVersion, out: &mut GateOutput) -> (BlockFate, Vec<String>) {
    let texts = block.texts();
    let Some((comment, lines)) = block.leading_comment_lines(&mut out.diagnostics) else {
        return (BlockFate::Unversioned, texts);
    };

    match comment.opener {
        CommentOpener::Header if is_file_header(lines) => {
            if let Some((line, raw)) = first_since(lines)
                && out.file_version.is_none()
            {
                out.file_version = parse_since(line, &raw, &mut out.diagnostics);
            }
            (BlockFate::FileHeader, texts)
        }
        CommentOpener::Doc => match first_since(lines) {
            Some((line, raw)) => match parse_since(line, &raw, &mut out.diagnostics) {
                Some(since) if &since <= target => (BlockFate::Kept { since: raw }, texts),
                Some(_) => (BlockFate::DroppedForVersion { since: raw }, texts),
                None => (BlockFate::Unversioned, texts),
            },
            None => (BlockFate::Unversioned, texts),
        },
        _ => (BlockFate::Unversioned, texts),
    }
}

fn is_file_header(lines: &[SourceLine]) -> bool {
    let text = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    text.find("@file")
        .is_some_and(|at| text[at..].contains("@defgroup"))
}

/// Line number and raw token of the first `@since <token>` in the comment.
fn first_since(lines: &[SourceLine]) -> Option<(usize, String)> {
    lines.iter().find_map(|line| {
        let at = line.text.find(SINCE)?;
        let token = line.text[at + SINCE.len()..]
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        Some((line.number, token))
    })
}

fn parse_since(line: usize, raw: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<DocVersion> {
    match raw.parse::<DocVersion>() {
        Ok(v) => Some(v),
        Err(reason) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedVersion,
                line,
                format!("{}; block kept for every version", reason),
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::block::segment;
    use crate::engine::tag::TagScanner;

    fn blocks(text: &str) -> Vec<Block> {
        let scanner = TagScanner::new("Conan", &[]).unwrap();
        segment(scanner.scan(text), DOC_SEPARATOR)
    }

    fn v(s: &str) -> DocVersion {
        s.parse().unwrap()
    }

    const OBJECT_12: &str = "/**\n * @brief newer\n * @since 1.2\n */\nvoid newer();";

    #[test]
    fn test_version_parse_pads_missing_components() {
        assert_eq!(v("1"), DocVersion::new(1, 0, 0));
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("0.10.3").to_string(), "0.10.3");
        assert!("1.2.3.4".parse::<DocVersion>().is_err());
        assert!("1.x".parse::<DocVersion>().is_err());
        assert!("".parse::<DocVersion>().is_err());
        assert!("-1".parse::<DocVersion>().is_err());
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2") > v("1.99.99"));
    }

    #[test]
    fn test_since_gate_scenario() {
        let b = blocks(OBJECT_12);
        assert!(gate(&b, &v("1.1.0")).lines.is_empty());
        assert_eq!(gate(&b, &v("1.2.0")).lines.len(), 5);
        assert_eq!(gate(&b, &v("1.3")).lines.len(), 5);
    }

    #[test]
    fn test_unversioned_blocks_always_kept() {
        let text = "int a;\n\n\n\nclass Base {};";
        let out = gate(&blocks(text), &v("0.1"));
        assert_eq!(out.lines.join("\n"), text);
        assert!(out.fates.iter().all(|(_, f)| *f == BlockFate::Unversioned));
    }

    #[test]
    fn test_file_header_group_markers() {
        let text = format!(
            "/*!\n * @file a.hpp\n * @defgroup a A\n * @since 2.0\n */\n\n\n\n{}",
            OBJECT_12
        );
        let out = gate(&blocks(&text), &v("1.9"));
        assert_eq!(out.file_version, Some(v("2.0")));
        assert!(excludes_file(out.file_version.as_ref(), &v("1.9")));
        assert!(!excludes_file(out.file_version.as_ref(), &v("2.0")));
        assert_eq!(out.lines.iter().filter(|l| *l == GROUP_OPEN).count(), 1);
        assert_eq!(out.lines.last().map(String::as_str), Some(GROUP_CLOSE));
        assert_eq!(out.dropped(), 0);
    }

    #[test]
    fn test_header_requires_file_before_defgroup() {
        let text = "/*!\n * @defgroup a A\n * @file a.hpp\n */";
        let out = gate(&blocks(text), &v("1.0"));
        assert_eq!(out.fates[0].1, BlockFate::Unversioned);
        assert!(!out.lines.contains(&GROUP_CLOSE.to_string()));
    }

    #[test]
    fn test_malformed_since_keeps_block() {
        let text = "/**\n * @since one.two\n */\nvoid f();";
        let out = gate(&blocks(text), &v("0.0.1"));
        assert_eq!(out.lines.len(), 4);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::MalformedVersion);
        assert_eq!(out.diagnostics[0].line, 2);
    }

    #[test]
    fn test_unterminated_comment_keeps_block() {
        let text = "/**\n * @since 9.0\nvoid f();";
        let out = gate(&blocks(text), &v("1.0"));
        assert_eq!(out.lines.len(), 3);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnterminatedComment);
    }

    #[test]
    fn test_kept_set_grows_with_version() {
        let text = [
            "/**\n * @since 1.0\n */\nvoid a();",
            "/**\n * @since 1.5\n */\nvoid b();",
            "/**\n * @since 2\n */\nvoid c();",
            "void d();",
        ]
        .join("\n\n\n\n");
        let b = blocks(&text);
        let targets = ["0.9", "1.0", "1.4.9", "1.5", "2.0.0", "3"];
        let kept_sets: Vec<Vec<usize>> = targets
            .iter()
            .map(|t| {
                gate(&b, &v(t))
                    .fates
                    .iter()
                    .filter(|(_, f)| !matches!(f, BlockFate::DroppedForVersion { .. }))
                    .map(|(line, _)| *line)
                    .collect()
            })
            .collect();
        for pair in kept_sets.windows(2) {
            assert!(pair[0].iter().all(|line| pair[1].contains(line)));
        }
        assert_eq!(kept_sets[0].len(), 1);
        assert_eq!(kept_sets[5].len(), 4);
    }
}
