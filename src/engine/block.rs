//! Blank-run block segmentation.
//!
//! A file is cut into [`Block`]s at every run of exactly `separator` empty
//! lines. Shorter runs stay inside the block; a longer run yields one separator
//! per full `separator` lines and the remainder leads the next block, so
//! [`join`] restores the original line sequence.

use super::diagnostic::{Diagnostic, DiagnosticKind};
use super::tag::{CommentOpener, SourceLine, closes_comment, comment_opener};

/// Blank-line run separating objects in declaration/definition files.
pub const MODULE_SEPARATOR: usize = 2;

/// Blank-line run separating objects in documentation sources.
pub const DOC_SEPARATOR: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub lines: Vec<SourceLine>,
}

/// The comment a block opens with, as line indices into the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingComment {
    pub opener: CommentOpener,
    pub start: usize,
    /// Index of the terminating line; `None` when the comment never closes.
    pub end: Option<usize>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(SourceLine::is_blank)
    }

    /// Line number of the first line, or 0 for an empty block.
    pub fn first_line(&self) -> usize {
        self.lines.first().map(|l| l.number).unwrap_or(0)
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }

    /// The block without its leading and trailing blank lines.
    pub fn trimmed(&self) -> &[SourceLine] {
        let start = self
            .lines
            .iter()
            .position(|l| !l.is_blank())
            .unwrap_or(self.lines.len());
        let end = self
            .lines
            .iter()
            .rposition(|l| !l.is_blank())
            .map(|i| i + 1)
            .unwrap_or(start);
        &self.lines[start..end]
    }

    /// The comment opening on the first non-blank line, if any.
    pub fn leading_comment(&self) -> Option<LeadingComment> {
        let start = self.lines.iter().position(|l| !l.is_blank())?;
        let opener = comment_opener(&self.lines[start].text)?;
        let end = self.lines[start..]
            .iter()
            .enumerate()
            .find(|(offset, line)| closes_comment(&line.text, *offset == 0))
            .map(|(offset, _)| start + offset);
        Some(LeadingComment { opener, start, end })
    }

    /// Lines of the leading comment. An unterminated comment yields a
    /// diagnostic and `None`.
    pub fn leading_comment_lines(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<(LeadingComment, &[SourceLine])> {
        let comment = self.leading_comment()?;
        match comment.end {
            Some(end) => Some((comment, &self.lines[comment.start..=end])),
            None => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnterminatedComment,
                    self.lines[comment.start].number,
                    "comment is never closed; block treated as un-annotated",
                ));
                None
            }
        }
    }
}

pub fn segment(lines: Vec<SourceLine>, separator: usize) -> Vec<Block> {
    let separator = separator.max(1);
    let mut blocks = Vec::new();
    let mut current = Block::default();
    let mut run: Vec<SourceLine> = Vec::new();

    for line in lines {
        if line.is_blank() {
            run.push(line);
            if run.len() == separator {
                run.clear();
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.lines.append(&mut run);
            current.lines.push(line);
        }
    }

    current.lines.append(&mut run);
    blocks.push(current);
    blocks
}

/// Rejoin blocks of text with `separator` empty lines between neighbours.
pub fn join<I, B>(blocks: I, separator: usize) -> Vec<String>
where
    I: IntoIterator<Item = B>,
    B: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        if i > 0 {
            out.extend(std::iter::repeat_n(String::new(), separator));
        }
        out.extend(block);
    }
    out
}
