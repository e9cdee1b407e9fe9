//! `@exporter` / `@attacher` promotion of object blocks.

use super::block::{Block, MODULE_SEPARATOR, segment};
use super::diagnostic::{Diagnostic, DiagnosticKind};
use super::tag::SourceLine;
use serde::Serialize;

/// Prefixed to the first line after an exporter's comment.
pub const EXPORT_TOKEN: &str = "export ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportTag {
    Exporter,
    Attacher,
}

impl ExportTag {
    pub const ALL: [ExportTag; 2] = [ExportTag::Exporter, ExportTag::Attacher];

    pub fn directive(&self) -> &'static str {
        match self {
            ExportTag::Exporter => " * @exporter",
            ExportTag::Attacher => " * @attacher",
        }
    }

    /// The tag a directive line carries, if it is one.
    pub fn parse_directive(line: &str) -> Option<ExportTag> {
        Self::ALL.into_iter().find(|tag| {
            line.strip_prefix(tag.directive())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBlock {
    pub tag: Option<ExportTag>,
    pub first_line: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExportOutput {
    pub blocks: Vec<ObjectBlock>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExportOutput {
    pub fn with_tag(&self, tag: Option<ExportTag>) -> impl Iterator<Item = &ObjectBlock> {
        self.blocks.iter().filter(move |b| b.tag == tag)
    }
}

/// Split a file body into object blocks and apply the export directives.
/// Blank-only blocks are dropped; the rest keep their source order.
pub fn process(body: Vec<SourceLine>) -> ExportOutput {
    let mut out = ExportOutput::default();

    for block in segment(body, MODULE_SEPARATOR) {
        let trimmed = Block {
            lines: block.trimmed().to_vec(),
        };
        if trimmed.is_empty() {
            continue;
        }
        let object = promote(&trimmed, &mut out.diagnostics);
        out.blocks.push(object);
    }

    out
}

fn promote(block: &Block, diagnostics: &mut Vec<Diagnostic>) -> ObjectBlock {
    let first_line = block.first_line();
    let plain = || ObjectBlock {
        tag: None,
        first_line,
        lines: block.texts(),
    };

    let Some((comment, comment_lines)) = block.leading_comment_lines(diagnostics) else {
        return plain();
    };

    let directives: Vec<(usize, ExportTag)> = comment_lines
        .iter()
        .enumerate()
        .filter_map(|(offset, line)| {
            ExportTag::parse_directive(&line.text).map(|tag| (comment.start + offset, tag))
        })
        .collect();

    let Some(&(_, tag)) = directives.first() else {
        return plain();
    };

    if directives.iter().any(|(_, other)| *other != tag) {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::ConflictingExportTags,
            first_line,
            format!("both export tags present; treated as {:?}", tag),
        ));
    }

    // end is Some: leading_comment_lines only returns terminated comments
    let marker_at = comment.end.map(|end| end + 1);
    if tag == ExportTag::Exporter && marker_at.is_none_or(|i| i >= block.lines.len()) {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::DanglingExport,
            first_line,
            "@exporter comment is not followed by a declaration",
        ));
    }

    let lines = block
        .lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !directives.iter().any(|(d, _)| d == i))
        .map(|(i, line)| {
            let exported = tag == ExportTag::Exporter
                && Some(i) == marker_at
                && !line.text.starts_with(EXPORT_TOKEN);
            if exported {
                format!("{}{}", EXPORT_TOKEN, line.text)
            } else {
                line.text.clone()
            }
        })
        .collect();

    ObjectBlock {
        tag: Some(tag),
        first_line,
        lines,
    }
}
