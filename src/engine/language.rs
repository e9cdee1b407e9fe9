//! Per-language slicing of documentation sources.
//!
//! A ` * @word ... [code] ...` line opens a block in `code`; the next tag line
//! without a marker closes it. Everything else is global and visible in every
//! language. A block must be closed before the comment it lives in ends,
//! otherwise the code after the comment would silently inherit the language.

use super::tag::{SourceLine, TagKind, TagScanner};
use crate::error::{SpliceError, SpliceResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    Global,
    Language(String),
}

impl Attribution {
    pub fn is_global(&self) -> bool {
        matches!(self, Attribution::Global)
    }

    pub fn visible_in(&self, language: &str) -> bool {
        match self {
            Attribution::Global => true,
            Attribution::Language(code) => code == language,
        }
    }
}

/// Attribute every line to the global group or exactly one language.
pub fn attribute(scanner: &TagScanner, lines: &[SourceLine]) -> SpliceResult<Vec<Attribution>> {
    let mut active: Option<(&str, usize)> = None;
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        match &line.kind {
            TagKind::LanguageTag(marker) => {
                if scanner.language_markers(&line.text).len() > 1 {
                    return Err(SpliceError::MultipleLanguageMarkers { line: line.number });
                }
                active = Some((marker.code.as_str(), line.number));
            }
            TagKind::CommentTag => active = None,
            _ => {}
        }

        if let Some((code, opened_at)) = active
            && line.text.contains("*/")
        {
            return Err(SpliceError::OverlappingLanguageBlock {
                line: line.number,
                language: code.to_string(),
                opened_at,
            });
        }

        out.push(match active {
            Some((code, _)) => Attribution::Language(code.to_string()),
            None => Attribution::Global,
        });
    }

    Ok(out)
}

/// Lines visible in `target`, with the marker excised from the lines that
/// open a `target` block.
pub fn slice(scanner: &TagScanner, lines: &[SourceLine], target: &str) -> SpliceResult<Vec<String>> {
    if !scanner.knows_language(target) {
        return Err(SpliceError::config(format!(
            "language '{}' is not configured (known: {})",
            target,
            scanner.languages().join(", ")
        )));
    }

    let attributions = attribute(scanner, lines)?;
    Ok(lines
        .iter()
        .zip(&attributions)
        .filter(|(_, attribution)| attribution.visible_in(target))
        .map(|(line, _)| line.emitted_for(target))
        .collect())
}
