//! Removal of intermediate doc build files.

use super::doxyfile::GENERATED_DOXYFILE;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories named `_*` and generated `Doxyfile.in` files below `output`.
pub fn temporaries(output: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walk = WalkDir::new(output).min_depth(1).into_iter();

    while let Some(entry) = walk.next() {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() && name.starts_with('_') {
            found.push(entry.path().to_path_buf());
            walk.skip_current_dir();
        } else if entry.file_type().is_file() && name == GENERATED_DOXYFILE {
            found.push(entry.path().to_path_buf());
        }
    }
    found
}

/// Returns how many entries were removed.
pub fn clean_temporaries(output: &Path) -> Result<usize> {
    if !output.exists() {
        return Ok(0);
    }
    let found = temporaries(output);
    for path in &found {
        if path.is_dir() {
            fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        } else {
            fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(found.len())
}
