//! Removal of `@exporter` / `@attacher` directive lines, for shipping sources
//! without build directives.

use crate::config::ModulesConfig;
use crate::engine::ExportTag;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The text without directive lines, and how many were removed.
pub fn strip_directives(text: &str) -> (String, usize) {
    let mut removed = 0;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if ExportTag::parse_directive(bare).is_some() {
            removed += 1;
        } else {
            out.push_str(line);
        }
    }
    (out, removed)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StripReport {
    pub files: Vec<(PathBuf, usize)>,
}

impl StripReport {
    pub fn total(&self) -> usize {
        self.files.iter().map(|(_, n)| n).sum()
    }
}

/// Strip every declaration and definition file of the project.
pub fn strip_project(root: &Path, config: &ModulesConfig, dry_run: bool) -> Result<StripReport> {
    let targets = [
        (root.join(&config.declaration_dir), &config.declaration_suffix),
        (root.join(&config.definition_dir), &config.definition_suffix),
    ];

    let mut report = StripReport::default();
    for (dir, suffix) in targets {
        for entry in WalkDir::new(&dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let matches = path.extension().is_some_and(|e| e == suffix.as_str());
            if !entry.file_type().is_file() || !matches {
                continue;
            }
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let (stripped, removed) = strip_directives(&text);
            if removed == 0 {
                continue;
            }
            if !dry_run {
                fs::write(path, stripped)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            report.files.push((path.to_path_buf(), removed));
        }
    }
    Ok(report)
}
