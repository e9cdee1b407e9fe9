//! The pure transformation core: lines in, lines out, no filesystem access.
//!
//! [`TagScanner`] classifies lines, [`segment`] cuts them into blocks, and the
//! three pipelines (language slicing, version gating, module synthesis) only
//! consume those typed values.

pub mod block;
pub mod diagnostic;
pub mod export;
pub mod language;
pub mod module;
pub mod tag;
pub mod version;

pub use block::{Block, DOC_SEPARATOR, MODULE_SEPARATOR, join, segment};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use export::{ExportTag, ObjectBlock};
pub use language::{Attribution, attribute, slice};
pub use module::{
    ModulePair, ModuleUnit, PairSide, STANDARD_HEADERS, Synthesizer, Whitelist, is_pragma_once,
};
pub use tag::{DEFAULT_MARKER, SourceLine, TagKind, TagScanner};
pub use version::{BlockFate, DocVersion, GateOutput, excludes_file, gate};

use crate::error::SpliceResult;
use serde::Serialize;

/// One documentation source filtered for a (language, version) pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilteredDocument {
    pub lines: Vec<String>,
    /// Version declared by the file-header block, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_version: Option<String>,
    /// True when the file-header version is newer than the target: the file
    /// does not belong in that version's tree at all.
    pub excluded: bool,
    pub fates: Vec<(usize, BlockFate)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FilteredDocument {
    pub fn text(&self) -> String {
        to_text(&self.lines)
    }
}

/// Slice `text` for `language`, then gate the result for `version` when one
/// is given. Line numbers in diagnostics refer to the sliced text.
pub fn filter_document(
    scanner: &TagScanner,
    text: &str,
    language: &str,
    version: Option<&DocVersion>,
) -> SpliceResult<FilteredDocument> {
    let sliced = slice(scanner, &scanner.scan(text), language)?;

    let Some(target) = version else {
        return Ok(FilteredDocument {
            lines: sliced,
            ..Default::default()
        });
    };

    let blocks = segment(scanner.scan(&sliced.join("\n")), DOC_SEPARATOR);
    let gated = gate(&blocks, target);
    Ok(FilteredDocument {
        excluded: excludes_file(gated.file_version.as_ref(), target),
        file_version: gated.file_version.as_ref().map(ToString::to_string),
        lines: gated.lines,
        fates: gated.fates,
        diagnostics: gated.diagnostics,
    })
}

/// Lines back to file text, newline-terminated.
pub fn to_text(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\
/*!
 * @file net.hpp
 * @brief [en] Networking.
 * @brief [zh] 网络。
 * @defgroup net
 * @since 2.0
 */



/**
 * @brief [en] Trains.
 * @brief [zh] 训练。
 * @since 1.0
 */
void train();";

    fn scanner() -> TagScanner {
        TagScanner::new(DEFAULT_MARKER, &["en".to_string(), "zh".to_string()]).unwrap()
    }

    #[test]
    fn test_filter_language_only() {
        let doc = filter_document(&scanner(), HEADER, "zh", None).unwrap();
        assert!(doc.lines.contains(&" * @brief 训练。".to_string()));
        assert!(!doc.lines.iter().any(|l| l.contains("Trains")));
        assert!(!doc.excluded);
        assert!(doc.fates.is_empty());
    }

    #[test]
    fn test_filter_excludes_file_newer_than_target() {
        let target: DocVersion = "1.9".parse().unwrap();
        let doc = filter_document(&scanner(), HEADER, "en", Some(&target)).unwrap();
        assert!(doc.excluded);
        assert_eq!(doc.file_version.as_deref(), Some("2.0.0"));

        let target: DocVersion = "2.0".parse().unwrap();
        let doc = filter_document(&scanner(), HEADER, "en", Some(&target)).unwrap();
        assert!(!doc.excluded);
        assert_eq!(doc.lines.last().map(String::as_str), Some(version::GROUP_CLOSE));
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        assert!(filter_document(&scanner(), HEADER, "fr", None).is_err());
    }

    #[test]
    fn test_to_text_terminates_with_newline() {
        assert_eq!(to_text(&["a".to_string(), "b".to_string()]), "a\nb\n");
        assert_eq!(to_text(&[]), "");
    }
}
