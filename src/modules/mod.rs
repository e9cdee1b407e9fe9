//! Module interface generation for a whole project.
//!
//! One pass is: delete every previously generated unit, then synthesize each
//! declaration/definition pair in parallel and write it beside the
//! definition. The deletion finishes before the first unit is written.

pub mod pairs;
pub mod watcher;

use crate::config::ProjectConfig;
use crate::engine::{Diagnostic, Synthesizer};
use crate::error::SpliceError;
use crate::ui;
use anyhow::{Context, Result};
use colored::*;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ModulesOptions {
    /// Render units without touching disk.
    pub dry_run: bool,
    pub show_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum UnitStatus {
    Written,
    Rendered { text: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub output: PathBuf,
    pub status: UnitStatus,
    pub imports: usize,
    pub escaped: usize,
    pub exported: usize,
    pub attached: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModulesReport {
    pub stale_removed: Vec<PathBuf>,
    /// False when `[modules].generate_inplace` turned generation off.
    pub generated: bool,
    pub units: Vec<UnitReport>,
}

impl ModulesReport {
    pub fn failed(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Failed { .. }))
            .count()
    }
}

/// Delete generated units. In a dry run only lists them.
pub fn clean_stale(root: &Path, config: &ProjectConfig, dry_run: bool) -> Result<Vec<PathBuf>> {
    let stale = pairs::stale_modules(root, &config.modules);
    if !dry_run {
        for path in &stale {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale module {}", path.display()))?;
        }
    }
    Ok(stale)
}

pub fn generate(root: &Path, config: &ProjectConfig, opts: &ModulesOptions) -> Result<ModulesReport> {
    let scanner = config.scanner()?;
    let whitelist = config.whitelist()?;
    let synthesizer =
        Synthesizer::new(&scanner, &whitelist).include_untagged(config.modules.include_untagged);

    let mut report = ModulesReport {
        stale_removed: clean_stale(root, config, opts.dry_run)?,
        generated: config.modules.generate_inplace,
        units: Vec::new(),
    };
    if !config.modules.generate_inplace {
        return Ok(report);
    }

    let pairs = pairs::discover_pairs(root, &config.modules)?;
    let pb = ui::progress(pairs.len(), opts.show_progress);

    report.units = pairs
        .par_iter()
        .map(|pair| {
            pb.set_message(pair.name.clone());
            let output = pairs::module_path(pair, &config.modules.module_suffix);
            let unit = synthesizer.synthesize(pair);
            let unit_report = match unit {
                Ok(unit) => {
                    let rendered = unit.render();
                    let status = if opts.dry_run {
                        UnitStatus::Rendered { text: rendered }
                    } else {
                        match fs::write(&output, rendered) {
                            Ok(()) => UnitStatus::Written,
                            Err(e) => UnitStatus::Failed {
                                reason: SpliceError::io(&output, e).to_string(),
                            },
                        }
                    };
                    UnitReport {
                        name: unit.name,
                        output,
                        status,
                        imports: unit.imports.len(),
                        escaped: unit.escaped.len(),
                        exported: unit.exported,
                        attached: unit.attached,
                        diagnostics: unit.diagnostics,
                    }
                }
                Err(e) if e.is_unit_local() => {
                    pb.suspend(|| ui::fail(e.to_string()));
                    UnitReport {
                        name: pair.name.clone(),
                        output,
                        status: UnitStatus::Failed {
                            reason: e.to_string(),
                        },
                        imports: 0,
                        escaped: 0,
                        exported: 0,
                        attached: 0,
                        diagnostics: Vec::new(),
                    }
                }
                Err(e) => return Err(e),
            };
            pb.inc(1);
            Ok(unit_report)
        })
        .collect::<Result<Vec<_>, SpliceError>>()?;
    pb.finish_and_clear();

    Ok(report)
}

pub fn print_report(report: &ModulesReport, verbose: bool) {
    for path in &report.stale_removed {
        if verbose {
            println!("   {} {}", "removed".dimmed(), path.display());
        }
    }
    if !report.stale_removed.is_empty() {
        ui::success(format!("Removed {} stale module files", report.stale_removed.len()));
    }
    if !report.generated {
        ui::warn("Module generation is off ([modules].generate_inplace = false)");
        return;
    }

    let mut table = ui::Table::new(&["Unit", "Output", "Imports", "Escaped", "Exported", "Status"]);
    for unit in &report.units {
        let status = match &unit.status {
            UnitStatus::Written => "written".green().to_string(),
            UnitStatus::Rendered { .. } => "dry run".cyan().to_string(),
            UnitStatus::Failed { .. } => "failed".red().to_string(),
        };
        table.add_row(vec![
            unit.name.clone(),
            unit.output.display().to_string(),
            unit.imports.to_string(),
            unit.escaped.to_string(),
            format!("{} (+{})", unit.exported, unit.attached),
            status,
        ]);
    }
    if !table.is_empty() {
        table.print();
    }

    for unit in &report.units {
        for diag in &unit.diagnostics {
            println!("{}", ui::diagnostic(Path::new(&unit.name), diag));
        }
        if let UnitStatus::Rendered { text } = &unit.status {
            println!("{} {}", "──".dimmed(), unit.output.display().to_string().bold());
            print!("{}", text);
        }
    }

    let failed = report.failed();
    if failed == 0 {
        ui::success(format!("Generated {} module units", report.units.len()));
    } else {
        ui::fail(format!(
            "{} of {} module units failed",
            failed,
            report.units.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn project() -> (tempfile::TempDir, ProjectConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("include")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("include/net.hpp"),
            "// Conan::ImportStart\n#include <vector>\n// Conan::ImportEnd\n\n\n/**\n * @exporter\n */\nvoid train();\n",
        )
        .unwrap();
        fs::write(
            root.join("src/net.cpp"),
            "// Conan::ImportStart\n#include \"net.hpp\"\n// Conan::ImportEnd\n\n\nvoid train() {}\n",
        )
        .unwrap();
        fs::write(root.join("src/lonely.cpp"), "int x;\n").unwrap();
        fs::write(root.join("src/old.cppm"), "stale").unwrap();
        let config = parse_config(
            "[package]\nname = \"net\"\n[modules]\nmodule_suffix = \"cppm\"\nstd_modules = [\"vector\"]\n",
        )
        .unwrap();
        (dir, config)
    }

    #[test]
    fn test_generate_writes_units_and_reports_missing_pairs() {
        let (dir, config) = project();
        let report = generate(dir.path(), &config, &ModulesOptions::default()).unwrap();

        assert_eq!(report.stale_removed.len(), 1);
        assert!(!dir.path().join("src/old.cppm").exists());
        assert_eq!(report.units.len(), 2);
        assert_eq!(report.failed(), 1);

        let text = fs::read_to_string(dir.path().join("src/net.cppm")).unwrap();
        assert!(text.starts_with("module;\nimport <vector>;\nexport module net;\n"));
        assert!(text.contains("export void train();"));
        assert!(!text.contains("net.hpp"));
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let (dir, config) = project();
        generate(dir.path(), &config, &ModulesOptions::default()).unwrap();
        let first = fs::read_to_string(dir.path().join("src/net.cppm")).unwrap();
        let report = generate(dir.path(), &config, &ModulesOptions::default()).unwrap();
        let second = fs::read_to_string(dir.path().join("src/net.cppm")).unwrap();
        assert_eq!(first, second);
        // the unit written by the first pass is stale for the second
        assert_eq!(report.stale_removed.len(), 1);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (dir, config) = project();
        let opts = ModulesOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = generate(dir.path(), &config, &opts).unwrap();
        assert!(dir.path().join("src/old.cppm").exists());
        assert!(!dir.path().join("src/net.cppm").exists());
        assert!(report
            .units
            .iter()
            .any(|u| matches!(&u.status, UnitStatus::Rendered { text } if text.contains("export module net;"))));
    }

    #[test]
    fn test_generation_can_be_disabled() {
        let (dir, mut config) = project();
        config.modules.generate_inplace = false;
        let report = generate(dir.path(), &config, &ModulesOptions::default()).unwrap();
        assert!(!report.generated);
        assert!(report.units.is_empty());
        assert!(!dir.path().join("src/old.cppm").exists());
    }

    #[test]
    fn test_custom_suffix_units_are_cleaned_and_sources_kept() {
        let (dir, mut config) = project();
        config.modules.module_suffix = "mpp".into();
        fs::write(dir.path().join("src/gone.mpp"), "stale").unwrap();

        let report = generate(dir.path(), &config, &ModulesOptions::default()).unwrap();
        assert!(!dir.path().join("src/gone.mpp").exists());
        assert!(report.stale_removed.iter().any(|p| p.ends_with("src/gone.mpp")));
        assert!(dir.path().join("src/net.mpp").exists());
        let source = fs::read_to_string(dir.path().join("src/net.cpp")).unwrap();
        assert!(source.contains("void train() {}"));
        assert!(!source.starts_with("module;"));
    }
}
