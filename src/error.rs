//! Error taxonomy shared by the engine and the filesystem shell.
//!
//! Only unrecoverable problems live here. Recoverable annotation problems
//! (an unparseable `@since`, an unterminated comment) are reported as
//! [`Diagnostic`](crate::engine::Diagnostic) values instead and never abort a pass.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpliceError {
    /// Requested language/version outside the configured sets, or a malformed
    /// configuration value. Fatal for the whole pass.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A declaration file without its definition, or the other way round.
    /// Fatal for that module unit only.
    #[error("module '{module}' is missing its {missing} file ({})", expected.display())]
    MissingPair {
        module: String,
        missing: &'static str,
        expected: PathBuf,
    },

    #[error(
        "line {line}: language block [{language}] opened at line {opened_at} is still open where its comment ends; close it with an untagged ` * @` line"
    )]
    OverlappingLanguageBlock {
        line: usize,
        language: String,
        opened_at: usize,
    },

    #[error("line {line}: more than one language marker on a single line")]
    MultipleLanguageMarkers { line: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse splice.toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl SpliceError {
    pub fn config(msg: impl Into<String>) -> Self {
        SpliceError::Configuration(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpliceError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that only invalidate one unit of work (the pass may continue).
    pub fn is_unit_local(&self) -> bool {
        matches!(self, SpliceError::MissingPair { .. })
    }
}

pub type SpliceResult<T> = std::result::Result<T, SpliceError>;
