//! Line classification.
//!
//! Every consumer of the annotation grammar goes through [`TagScanner`]; no
//! other module pattern-matches comment tags on its own.
//!
//! | Line                           | Kind            |
//! |--------------------------------|-----------------|
//! | *(empty)*                      | `Blank`         |
//! | `// <Marker>::ImportStart`     | `ImportBegin`   |
//! | `// <Marker>::ImportEnd`       | `ImportEnd`     |
//! | ` * @word ... [lang] rest`     | `LanguageTag`   |
//! | ` * @word ...`                 | `CommentTag`    |
//! | ` * prose`                     | `FreeComment`   |
//! | anything else                  | `None`          |

use crate::error::{SpliceError, SpliceResult};
use regex::Regex;
use std::ops::Range;

/// Marker name used in `// <Marker>::ImportStart` when none is configured.
pub const DEFAULT_MARKER: &str = "Conan";

const TAG_PREFIX: &str = " * @";
const FREE_PREFIX: &str = " * ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageMarker {
    pub code: String,
    /// Byte range excised when the line is emitted for `code`: the bracketed
    /// marker plus one adjoining space.
    pub cut: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
    None,
    CommentTag,
    LanguageTag(LanguageMarker),
    FreeComment,
    ImportBegin,
    ImportEnd,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based position in the originating file.
    pub number: usize,
    pub text: String,
    pub kind: TagKind,
}

impl SourceLine {
    pub fn is_blank(&self) -> bool {
        self.kind == TagKind::Blank
    }

    /// The line as it is emitted for `language`: the marker is excised when the
    /// line opens a block in that language, otherwise the text is unchanged.
    pub fn emitted_for(&self, language: &str) -> String {
        match &self.kind {
            TagKind::LanguageTag(marker) if marker.code == language => {
                let mut out = String::with_capacity(self.text.len());
                out.push_str(&self.text[..marker.cut.start]);
                out.push_str(&self.text[marker.cut.end..]);
                out
            }
            _ => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagScanner {
    marker: String,
    languages: Vec<String>,
    language_re: Option<Regex>,
}

impl TagScanner {
    pub fn new(marker: &str, languages: &[String]) -> SpliceResult<Self> {
        if marker.trim().is_empty() || marker.contains(char::is_whitespace) {
            return Err(SpliceError::config(format!(
                "import marker '{}' must be a single non-empty word",
                marker
            )));
        }

        let language_re = if languages.is_empty() {
            None
        } else {
            let alternation = languages
                .iter()
                .map(|code| regex::escape(code))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"\[({})\](?: |$)", alternation)).map_err(|e| {
                SpliceError::config(format!("invalid language code set: {}", e))
            })?;
            Some(re)
        };

        Ok(Self {
            marker: marker.to_string(),
            languages: languages.to_vec(),
            language_re,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn knows_language(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l == code)
    }

    /// Prefix of a non-whitelisted import kept as a comment.
    pub fn escape_prefix(&self) -> String {
        format!("// {}::Escape ", self.marker)
    }

    pub fn import_start(&self) -> String {
        format!("// {}::ImportStart", self.marker)
    }

    pub fn import_end(&self) -> String {
        format!("// {}::ImportEnd", self.marker)
    }

    pub fn classify(&self, line: &str) -> TagKind {
        if line.is_empty() {
            return TagKind::Blank;
        }

        let trimmed = line.trim();
        if let Some(rest) = trimmed
            .strip_prefix("// ")
            .and_then(|r| r.strip_prefix(self.marker.as_str()))
            .and_then(|r| r.strip_prefix("::"))
        {
            match rest {
                "ImportStart" => return TagKind::ImportBegin,
                "ImportEnd" => return TagKind::ImportEnd,
                _ => {}
            }
        }

        if let Some(rest) = line.strip_prefix(TAG_PREFIX) {
            let has_word = rest.starts_with(|c: char| c.is_ascii_lowercase());
            if has_word && let Some(marker) = self.language_markers(line).into_iter().next() {
                return TagKind::LanguageTag(marker);
            }
            return TagKind::CommentTag;
        }

        if let Some(rest) = line.strip_prefix(FREE_PREFIX)
            && !rest.is_empty()
            && !rest.starts_with('@')
        {
            return TagKind::FreeComment;
        }

        TagKind::None
    }

    /// All configured-language markers on a tag line, left to right.
    pub fn language_markers(&self, line: &str) -> Vec<LanguageMarker> {
        let Some(re) = &self.language_re else {
            return Vec::new();
        };
        if !line.starts_with(TAG_PREFIX) {
            return Vec::new();
        }

        re.captures_iter(line)
            .filter_map(|caps| {
                let code = caps.get(1)?;
                let start = code.start() - 1;
                let end = code.end() + 1;
                let cut = if line[..start].ends_with(' ') {
                    start - 1..end
                } else if line[end..].starts_with(' ') {
                    start..end + 1
                } else {
                    start..end
                };
                Some(LanguageMarker {
                    code: code.as_str().to_string(),
                    cut,
                })
            })
            .collect()
    }

    pub fn scan(&self, text: &str) -> Vec<SourceLine> {
        text.lines()
            .enumerate()
            .map(|(i, line)| SourceLine {
                number: i + 1,
                text: line.to_string(),
                kind: self.classify(line),
            })
            .collect()
    }
}

/// Where a line sits relative to a `/* ... */` comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOpener {
    /// `/**`
    Doc,
    /// `/*!`
    Header,
    /// Any other `/*`.
    Plain,
}

pub fn comment_opener(line: &str) -> Option<CommentOpener> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("/**") {
        Some(CommentOpener::Doc)
    } else if trimmed.starts_with("/*!") {
        Some(CommentOpener::Header)
    } else if trimmed.starts_with("/*") {
        Some(CommentOpener::Plain)
    } else {
        None
    }
}

/// True when the line terminates a comment opened on this or an earlier line.
pub fn closes_comment(line: &str, opener_line: bool) -> bool {
    if opener_line {
        // skip the opening "/*" so "/*/" is not taken as a terminator
        line.trim_start()
            .get(2..)
            .is_some_and(|rest| rest.contains("*/"))
    } else {
        line.contains("*/")
    }
}
