use serde::Serialize;
use std::fmt;

/// Recoverable annotation problems. The affected block keeps flowing through
/// the pipeline (usually as "always kept"), the diagnostic rides along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    MalformedVersion,
    UnterminatedComment,
    MissingImportEnd,
    DanglingExport,
    ConflictingExportTags,
}

impl DiagnosticKind {
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedVersion => "malformed @since",
            DiagnosticKind::UnterminatedComment => "unterminated comment",
            DiagnosticKind::MissingImportEnd => "missing import end",
            DiagnosticKind::DanglingExport => "dangling export tag",
            DiagnosticKind::ConflictingExportTags => "conflicting export tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based line in the file the diagnostic was raised for.
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind.label(), self.message)
    }
}
