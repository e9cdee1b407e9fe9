//! Routing of documentation images to the doxygen and sphinx image folders.
//!
//! The file name prefix decides the destination: `IN*` doxygen only, `OUT*`
//! sphinx only, anything else both.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRoute {
    Doxygen,
    Sphinx,
    Both,
}

impl ImageRoute {
    pub fn for_name(name: &str) -> Self {
        if name.starts_with("IN") {
            ImageRoute::Doxygen
        } else if name.starts_with("OUT") {
            ImageRoute::Sphinx
        } else {
            ImageRoute::Both
        }
    }

    fn to_doxygen(self) -> bool {
        matches!(self, ImageRoute::Doxygen | ImageRoute::Both)
    }

    fn to_sphinx(self) -> bool {
        matches!(self, ImageRoute::Sphinx | ImageRoute::Both)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageReport {
    pub doxygen: usize,
    pub sphinx: usize,
}

/// Empty both destinations (files only, subdirectories are kept) and copy
/// every image from `source` to where its prefix routes it.
pub fn route_images(source: &Path, doxygen: &Path, sphinx: &Path) -> Result<ImageReport> {
    for dest in [doxygen, sphinx] {
        clear_files(dest)?;
        fs::create_dir_all(dest)
            .with_context(|| format!("Failed to create image folder {}", dest.display()))?;
    }

    let mut names: Vec<String> = fs::read_dir(source)
        .with_context(|| format!("Failed to read image folder {}", source.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    let mut report = ImageReport::default();
    for name in names {
        let from = source.join(&name);
        let route = ImageRoute::for_name(&name);
        if route.to_doxygen() {
            copy(&from, &doxygen.join(&name))?;
            report.doxygen += 1;
        }
        if route.to_sphinx() {
            copy(&from, &sphinx.join(&name))?;
            report.sphinx += 1;
        }
    }
    Ok(report)
}

fn copy(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

fn clear_files(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
