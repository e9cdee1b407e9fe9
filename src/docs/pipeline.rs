//! Source discovery and the per-(language, version) filtered trees.

use crate::engine::{BlockFate, Diagnostic, DocVersion, TagScanner, filter_document};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A documentation source, read once and shared by every tree.
#[derive(Debug, Clone)]
pub struct SourceDoc {
    pub path: PathBuf,
    /// Path below its configured folder; also its path inside each tree.
    pub relative: PathBuf,
    pub text: String,
}

/// Every file under `folders` whose suffix is one of `suffixes`, sorted.
pub fn collect_sources(root: &Path, folders: &[PathBuf], suffixes: &[String]) -> Result<Vec<SourceDoc>> {
    let mut sources = Vec::new();

    for folder in folders {
        let base = root.join(folder);
        if !base.exists() {
            continue;
        }
        for entry in WalkDir::new(&base).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let matches = path
                .extension()
                .is_some_and(|ext| suffixes.iter().any(|s| ext.to_string_lossy() == s.as_str()));
            if !entry.file_type().is_file() || !matches {
                continue;
            }
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            sources.push(SourceDoc {
                path: path.to_path_buf(),
                relative: path.strip_prefix(&base).unwrap_or(path).to_path_buf(),
                text,
            });
        }
    }

    sources.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(sources)
}

/// The declaration/definition counterpart of a file name: `h`↔`c`, `hpp`↔`cpp`.
pub fn pair_counterpart(path: &Path) -> Option<PathBuf> {
    let other = match path.extension()?.to_str()? {
        "h" => "c",
        "c" => "h",
        "hpp" => "cpp",
        "cpp" => "hpp",
        _ => return None,
    };
    Some(path.with_extension(other))
}

pub fn language_dir(output: &Path, language: &str) -> PathBuf {
    output.join(language)
}

pub fn version_dir(output: &Path, language: &str, version: &str) -> PathBuf {
    output.join(language).join(format!("v{}", version))
}

/// Where one tree's filtered sources are written.
pub fn docstrings_dir(output: &Path, language: &str, version: Option<&str>) -> PathBuf {
    match version {
        None => language_dir(output, language).join(format!("_{}_docstrings", language)),
        Some(v) => version_dir(output, language, v).join(format!("_{}_v{}_docstrings", language, v)),
    }
}

/// One unit of work: a language tree, or a language tree gated for a version.
#[derive(Debug, Clone)]
pub struct TreeSpec {
    pub language: String,
    /// Configured spelling, used in directory names.
    pub version: Option<(String, DocVersion)>,
}

impl TreeSpec {
    pub fn label(&self) -> String {
        match &self.version {
            Some((raw, _)) => format!("{} v{}", self.language, raw),
            None => self.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub fates: Vec<(usize, BlockFate)>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeReport {
    pub language: String,
    pub version: Option<String>,
    pub dir: PathBuf,
    pub written: usize,
    pub excluded: Vec<PathBuf>,
    pub blocks_dropped: usize,
    pub files: Vec<FileReport>,
}

impl TreeReport {
    pub fn diagnostics(&self) -> impl Iterator<Item = (&Path, &Diagnostic)> {
        self.files
            .iter()
            .flat_map(|f| f.diagnostics.iter().map(move |d| (f.file.as_path(), d)))
    }
}

/// The filtered content of a tree, before anything touches disk.
#[derive(Debug, Clone)]
pub struct Tree {
    pub spec: TreeSpec,
    pub files: Vec<(PathBuf, String)>,
    pub report: TreeReport,
}

/// Filter every source for one tree. A file whose header version is newer
/// than the target is left out together with its pair counterpart.
pub fn build_tree(
    scanner: &TagScanner,
    sources: &[SourceDoc],
    spec: &TreeSpec,
    output: &Path,
) -> Result<Tree> {
    let target = spec.version.as_ref().map(|(_, v)| v);
    let mut filtered = Vec::with_capacity(sources.len());
    let mut excluded = BTreeSet::new();
    let mut files = Vec::new();

    for source in sources {
        let doc = filter_document(scanner, &source.text, &spec.language, target)
            .with_context(|| format!("Failed to filter {} for {}", source.path.display(), spec.label()))?;
        if doc.excluded {
            excluded.insert(source.relative.clone());
            if let Some(pair) = pair_counterpart(&source.relative) {
                excluded.insert(pair);
            }
        }
        files.push(FileReport {
            file: source.path.clone(),
            fates: doc.fates.clone(),
            diagnostics: doc.diagnostics.clone(),
        });
        filtered.push((source.relative.clone(), doc));
    }

    let blocks_dropped = files
        .iter()
        .flat_map(|f| &f.fates)
        .filter(|(_, fate)| matches!(fate, BlockFate::DroppedForVersion { .. }))
        .count();

    let kept: Vec<(PathBuf, String)> = filtered
        .into_iter()
        .filter(|(rel, _)| !excluded.contains(rel))
        .map(|(rel, doc)| (rel, doc.text()))
        .collect();

    let version = spec.version.as_ref().map(|(raw, _)| raw.as_str());
    Ok(Tree {
        report: TreeReport {
            language: spec.language.clone(),
            version: version.map(String::from),
            dir: docstrings_dir(output, &spec.language, version),
            written: kept.len(),
            excluded: excluded
                .into_iter()
                .filter(|rel| sources.iter().any(|s| &s.relative == rel))
                .collect(),
            blocks_dropped,
            files,
        },
        spec: spec.clone(),
        files: kept,
    })
}

pub fn write_tree(tree: &Tree) -> Result<()> {
    let dir = &tree.report.dir;
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("Failed to clear {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    for (relative, text) in &tree.files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Remove every subdirectory of `output`; loose files (a sub-repository's
/// `.git` file, a hand-written page) survive.
pub fn prepare_output(output: &Path) -> Result<()> {
    if output.exists() {
        for entry in fs::read_dir(output)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
    }
    fs::create_dir_all(output).with_context(|| format!("Failed to create {}", output.display()))?;
    Ok(())
}
