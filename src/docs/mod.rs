//! The documentation pipeline: per-language and per-version source trees for
//! doxygen, plus the files around them (Doxyfile, navigation page, images).
//!
//! Layout below `[docs].output`:
//!
//! ```text
//! docs.html
//! en/_en_docstrings/net.hpp            <- sliced for en
//! en/v1.0/_en_v1.0_docstrings/net.hpp  <- sliced for en, gated for 1.0
//! en/v1.0/Doxyfile.in
//! ```

pub mod clean;
pub mod doxyfile;
pub mod images;
pub mod index;
pub mod pipeline;

use crate::config::ProjectConfig;
use crate::ui;
use anyhow::{Context, Result};
use colored::*;
use images::ImageReport;
use pipeline::{Tree, TreeReport, TreeSpec};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct DocsOptions {
    /// Restrict the pass to these languages (all configured when empty).
    pub languages: Vec<String>,
    /// Restrict the pass to these versions (all configured when empty).
    pub versions: Vec<String>,
    pub run_doxygen: bool,
    pub keep_temp: bool,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocsReport {
    pub sources: usize,
    pub trees: Vec<TreeReport>,
    pub doxyfiles: Vec<PathBuf>,
    pub index: Option<PathBuf>,
    pub images: Option<ImageReport>,
    pub doxygen_runs: usize,
    pub temporaries_removed: usize,
}

impl DocsReport {
    pub fn diagnostic_count(&self) -> usize {
        self.trees.iter().map(|t| t.diagnostics().count()).sum()
    }
}

/// Selected (language, version) units; unknown requests fail before any
/// output is touched.
fn plan(config: &ProjectConfig, opts: &DocsOptions) -> Result<Vec<TreeSpec>> {
    for language in &opts.languages {
        config.require_language(language)?;
    }
    let mut versions = Vec::new();
    for (raw, parsed) in config.docs.versions.iter().zip(config.doc_versions()?) {
        if opts.versions.is_empty() || opts.versions.contains(raw) {
            versions.push((raw.clone(), parsed));
        }
    }
    for requested in &opts.versions {
        config.require_version(requested)?;
    }

    let languages: Vec<&String> = config
        .docs
        .languages
        .iter()
        .filter(|l| opts.languages.is_empty() || opts.languages.contains(l))
        .collect();

    let mut specs = Vec::new();
    for language in languages {
        specs.push(TreeSpec {
            language: language.clone(),
            version: None,
        });
        for version in &versions {
            specs.push(TreeSpec {
                language: language.clone(),
                version: Some(version.clone()),
            });
        }
    }
    Ok(specs)
}

pub fn build(root: &Path, config: &ProjectConfig, opts: &DocsOptions) -> Result<DocsReport> {
    let specs = plan(config, opts)?;
    let scanner = config.scanner()?;
    let output = root.join(&config.docs.output);
    let sources = pipeline::collect_sources(root, &config.docs.folders, &config.docs.suffixes)?;

    // every tree is filtered before the first write, so a fatal annotation
    // error leaves the previous build untouched
    let trees: Vec<Tree> = specs
        .par_iter()
        .map(|spec| pipeline::build_tree(&scanner, &sources, spec, &output))
        .collect::<Result<_>>()?;

    let full_pass = opts.languages.is_empty() && opts.versions.is_empty();
    if full_pass {
        pipeline::prepare_output(&output)?;
    }

    let pb = ui::progress(trees.len(), opts.show_progress);
    trees
        .par_iter()
        .map(|tree| {
            pb.set_message(tree.spec.label());
            let written = pipeline::write_tree(tree);
            pb.inc(1);
            written
        })
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();

    let mut report = DocsReport {
        sources: sources.len(),
        ..Default::default()
    };

    report.doxyfiles = inject_doxyfiles(root, config, &trees, &output)?;

    if !config.docs.versions.is_empty() {
        let path = output.join("docs.html");
        let html = index::render(
            &config.package.name,
            &config.docs.languages,
            &config.docs.versions,
        );
        fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;
        report.index = Some(path);
    }

    if let Some(source) = &config.docs.images {
        let doxygen = root.join(
            config
                .docs
                .doxygen_images
                .clone()
                .unwrap_or_else(|| PathBuf::from("docs/doxygen/images")),
        );
        let sphinx = root.join(
            config
                .docs
                .sphinx_images
                .clone()
                .unwrap_or_else(|| PathBuf::from("docs/sphinx/images")),
        );
        let source = root.join(source);
        if source.exists() {
            report.images = Some(images::route_images(&source, &doxygen, &sphinx)?);
        } else if opts.show_progress {
            ui::warn(format!("Image folder {} not found, skipped", source.display()));
        }
    }

    if opts.run_doxygen {
        report.doxygen_runs = run_doxygen(&report.doxyfiles, opts.show_progress)?;
        if !opts.keep_temp {
            report.temporaries_removed = clean::clean_temporaries(&output)?;
        }
    }

    report.trees = trees.into_iter().map(|t| t.report).collect();
    Ok(report)
}

/// Write `Doxyfile.in` beside each version tree. A missing template only
/// skips this step.
fn inject_doxyfiles(
    root: &Path,
    config: &ProjectConfig,
    trees: &[Tree],
    output: &Path,
) -> Result<Vec<PathBuf>> {
    let template_path = root.join(&config.docs.doxyfile);
    let versioned: Vec<&Tree> = trees.iter().filter(|t| t.spec.version.is_some()).collect();
    if versioned.is_empty() {
        return Ok(Vec::new());
    }
    if !template_path.exists() {
        ui::warn(format!(
            "Doxyfile template {} not found, skipping Doxyfile.in generation",
            template_path.display()
        ));
        return Ok(Vec::new());
    }
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("Failed to read {}", template_path.display()))?;

    let mut written = Vec::new();
    for tree in versioned {
        let Some((raw, _)) = &tree.spec.version else { continue };
        let content = doxyfile::render(
            &template,
            &doxyfile::DoxyVars {
                lib_name: &config.package.name,
                suffixes: &config.docs.suffixes,
                graphviz_bin: &config.docs.graphviz_bin,
                language: &tree.spec.language,
                version: raw,
            },
        );
        let path = pipeline::version_dir(output, &tree.spec.language, raw)
            .join(doxyfile::GENERATED_DOXYFILE);
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn run_doxygen(doxyfiles: &[PathBuf], verbose: bool) -> Result<usize> {
    if !doxyfile::doxygen_available() {
        ui::warn("Doxygen not found. Install it to build html output.");
        return Ok(0);
    }

    let mut runs = 0;
    for file in doxyfiles {
        let Some(dir) = file.parent() else { continue };
        let pb = ui::spinner(format!("Running Doxygen in {}...", dir.display()));
        let output = doxyfile::run_doxygen(dir)?;
        pb.finish_and_clear();

        if output.status.success() {
            runs += 1;
            if verbose {
                ui::success(format!("Documentation generated in {}", dir.display()));
            }
        } else {
            ui::fail(format!("Doxygen failed in {}:", dir.display()));
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        }
    }
    Ok(runs)
}

pub fn print_report(report: &DocsReport, verbose: bool) {
    let mut table = ui::Table::new(&["Tree", "Files", "Excluded", "Dropped blocks", "Warnings"]);
    for tree in &report.trees {
        let label = match &tree.version {
            Some(v) => format!("{} v{}", tree.language, v),
            None => tree.language.clone(),
        };
        table.add_row(vec![
            label,
            tree.written.to_string(),
            tree.excluded.len().to_string(),
            tree.blocks_dropped.to_string(),
            tree.diagnostics().count().to_string(),
        ]);
    }
    if !table.is_empty() {
        table.print();
    }

    for tree in &report.trees {
        for (path, diag) in tree.diagnostics() {
            println!("{}", ui::diagnostic(path, diag));
        }
        if verbose {
            for file in &tree.files {
                for (line, fate) in &file.fates {
                    println!(
                        "   {} {}:{} {:?}",
                        tree.language.dimmed(),
                        file.file.display(),
                        line,
                        fate
                    );
                }
            }
        }
    }

    if let Some(images) = &report.images {
        ui::success(format!(
            "Routed images: {} to doxygen, {} to sphinx",
            images.doxygen, images.sphinx
        ));
    }
    if let Some(index) = &report.index {
        ui::success(format!("Navigation page written to {}", index.display()));
    }
    if report.temporaries_removed > 0 {
        ui::success(format!("Removed {} temporary entries", report.temporaries_removed));
    }
    ui::success(format!(
        "Filtered {} sources into {} trees ({} warnings)",
        report.sources,
        report.trees.len(),
        report.diagnostic_count()
    ));
}
