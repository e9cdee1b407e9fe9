//! Declaration/definition pair discovery and stale module lookup.

use crate::config::ModulesConfig;
use crate::engine::{ModulePair, PairSide};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of generated module interface units, whatever the platform.
pub const MODULE_SUFFIXES: &[&str] = &["ixx", "cppm"];

/// A unit we generate: either well-known suffix, or the configured one.
pub fn is_generated_module(path: &Path, module_suffix: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == module_suffix || MODULE_SUFFIXES.contains(&e))
}

/// `stem` with `.suffix` appended. Dots inside the stem are kept.
fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Paths relative to `dir` (without suffix) of every file ending in `suffix`.
fn stems_below(dir: &Path, suffix: &str) -> BTreeSet<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == suffix))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(dir).ok()?;
            let stem = rel.file_stem()?;
            Some(rel.with_file_name(stem))
        })
        .collect()
}

fn side(path: PathBuf) -> Result<PairSide> {
    let text = if path.is_file() {
        Some(fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?)
    } else {
        None
    };
    Ok(PairSide { path, text })
}

/// Every unit found on either side. `src/net/io.cpp` pairs with
/// `include/net/io.hpp`; a file without its counterpart still yields a pair
/// (with that side's text missing) so the gap is reported.
pub fn discover_pairs(root: &Path, config: &ModulesConfig) -> Result<Vec<ModulePair>> {
    let decl_dir = root.join(&config.declaration_dir);
    let def_dir = root.join(&config.definition_dir);

    let mut stems = stems_below(&def_dir, &config.definition_suffix);
    stems.extend(stems_below(&decl_dir, &config.declaration_suffix));

    stems
        .into_iter()
        .map(|stem| {
            let name = stem
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok(ModulePair {
                name,
                declaration: side(decl_dir.join(with_suffix(&stem, &config.declaration_suffix)))?,
                definition: side(def_dir.join(with_suffix(&stem, &config.definition_suffix)))?,
            })
        })
        .collect()
}

/// Where the unit for `pair` is written: beside its definition.
pub fn module_path(pair: &ModulePair, module_suffix: &str) -> PathBuf {
    let stem = pair.definition.path.with_extension("");
    with_suffix(&stem, module_suffix)
}

/// Previously generated module files below the definition dir. The
/// configured suffix never equals a source suffix (see
/// [`crate::config::ProjectConfig::validate`]), so sources are never listed.
pub fn stale_modules(root: &Path, config: &ModulesConfig) -> Vec<PathBuf> {
    WalkDir::new(root.join(&config.definition_dir))
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_generated_module(e.path(), &config.module_suffix))
        .map(|e| e.into_path())
        .collect()
}
