//! # splice CLI Entry Point
//!
//! Parses arguments with clap and routes each command to its library handler.
//!
//! ## Command Structure
//!
//! - **Pipelines**: `docs`, `modules`, `watch`, `clean`
//! - **Inspection**: `slice`, `synth`, `guide`
//! - **Maintenance**: `init`, `c-compat`, `strip-tags`, `changelog`, `completion`

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use splice::changelog::{self, ChangelogOptions, SkipPolicy};
use splice::config::{self, ProjectConfig};
use splice::docs::{self, DocsOptions};
use splice::engine::{self, ModulePair, PairSide, Synthesizer};
use splice::guide::{self, Topic};
use splice::modules::{self, ModulesOptions};
use splice::{ccompat, strip, ui};

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_utf8_console() {}

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "Doc trees and C++ modules from annotated C/C++ sources", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Project root holding splice.toml
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Print per-block decisions and removed files
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Print machine-readable reports
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter splice.toml
    Init {
        /// Library name (defaults to the directory name)
        name: Option<String>,
    },
    /// Build the per-language and per-version documentation trees
    Docs {
        /// Only these languages
        #[arg(long = "lang")]
        languages: Vec<String>,
        /// Only these documentation versions
        #[arg(long = "doc-version")]
        versions: Vec<String>,
        /// Run doxygen on every version tree
        #[arg(long)]
        run_doxygen: bool,
        /// Keep the intermediate trees and Doxyfile.in after doxygen
        #[arg(long)]
        keep_temp: bool,
    },
    /// Regenerate module interface units from declaration/definition pairs
    Modules {
        /// Print the units instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Regenerate modules whenever a source changes
    Watch,
    /// Remove generated modules and intermediate doc files
    Clean {
        /// Only generated module units
        #[arg(long)]
        modules: bool,
        /// Only intermediate doc files
        #[arg(long)]
        docs: bool,
    },
    /// Print one file filtered for a language (and version)
    Slice {
        file: PathBuf,
        #[arg(long)]
        lang: String,
        /// Gate for this documentation version too
        #[arg(id = "doc_version", long = "doc-version")]
        version: Option<String>,
    },
    /// Print the module unit synthesized from one pair
    Synth {
        declaration: PathBuf,
        definition: PathBuf,
        /// Module name (defaults to the declaration's stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the annotation conventions
    Guide {
        #[arg(value_enum)]
        topic: Option<Topic>,
    },
    /// Wrap C headers in extern "C" guards
    CCompat {
        /// Directory holding the .h files (defaults to the declaration dir)
        dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove @exporter/@attacher lines from declarations and definitions
    StripTags {
        #[arg(long)]
        dry_run: bool,
    },
    /// Bump the version and prepend a changelog section from git history
    Changelog {
        #[arg(long)]
        dry_run: bool,
        /// Commit the bumped files as a release commit
        #[arg(long)]
        commit: bool,
        #[arg(long, value_enum)]
        skip_policy: Option<SkipPolicy>,
    },
    /// Generate shell completions
    Completion { shell: Shell },
}

fn main() -> Result<()> {
    enable_utf8_console();

    let cli = Cli::parse();
    let root = cli.root.as_path();

    match &cli.command {
        Some(Commands::Init { name }) => {
            let name = match name {
                Some(n) => n.clone(),
                None => root
                    .canonicalize()?
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .context("Cannot derive a name from the root directory; pass one")?,
            };
            let path = config::init_config(root, &name)?;
            ui::success(format!("Created {}", path.display()));
            Ok(())
        }

        Some(Commands::Docs {
            languages,
            versions,
            run_doxygen,
            keep_temp,
        }) => {
            let config = config::load_config(root)?;
            let opts = DocsOptions {
                languages: languages.clone(),
                versions: versions.clone(),
                run_doxygen: *run_doxygen,
                keep_temp: *keep_temp,
                show_progress: !cli.json,
            };
            if !cli.json {
                println!("{} Building documentation trees...", "📚".magenta());
            }
            let report = docs::build(root, &config, &opts)?;
            if cli.json {
                print_json(&report)
            } else {
                docs::print_report(&report, cli.verbose);
                Ok(())
            }
        }

        Some(Commands::Modules { dry_run }) => {
            let config = config::load_config(root)?;
            let opts = ModulesOptions {
                dry_run: *dry_run,
                show_progress: !cli.json,
            };
            let report = modules::generate(root, &config, &opts)?;
            if cli.json {
                print_json(&report)?;
            } else {
                modules::print_report(&report, cli.verbose);
            }
            if report.failed() > 0 {
                anyhow::bail!("{} module units failed", report.failed());
            }
            Ok(())
        }

        Some(Commands::Watch) => {
            let config = config::load_config(root)?;
            modules::watcher::watch(root, &config, cli.verbose)
        }

        Some(Commands::Clean { modules: only_modules, docs: only_docs }) => {
            let config = config::load_config(root)?;
            let both = !only_modules && !only_docs;
            if both || *only_modules {
                let removed = modules::clean_stale(root, &config, false)?;
                ui::success(format!("Removed {} generated module files", removed.len()));
            }
            if both || *only_docs {
                let removed = docs::clean::clean_temporaries(&root.join(&config.docs.output))?;
                ui::success(format!("Removed {} intermediate doc entries", removed));
            }
            Ok(())
        }

        Some(Commands::Slice { file, lang, version }) => {
            let config = config::load_config(root)?;
            slice_file(&config, file, lang, version.as_deref(), cli.json, cli.verbose)
        }

        Some(Commands::Synth {
            declaration,
            definition,
            name,
        }) => {
            let config = config::load_config(root)?;
            synth_pair(&config, declaration, definition, name.as_deref(), cli.json)
        }

        Some(Commands::Guide { topic }) => {
            // the guide works outside a project too
            let config = config::load_config(root).unwrap_or_default();
            print!("{}", guide::render(&config, *topic));
            Ok(())
        }

        Some(Commands::CCompat { dir, dry_run }) => {
            let config = config::load_config(root)?;
            let dir = root.join(dir.as_ref().unwrap_or(&config.modules.declaration_dir));
            let report = ccompat::make_c_compatible(&dir, &config.scanner()?, *dry_run)?;
            if cli.json {
                return print_json(&report);
            }
            for path in &report.wrapped {
                println!("   {} {}", "wrapped".green(), path.display());
            }
            ui::success(format!(
                "{} headers wrapped, {} already compatible",
                report.wrapped.len(),
                report.already_wrapped.len()
            ));
            Ok(())
        }

        Some(Commands::StripTags { dry_run }) => {
            let config = config::load_config(root)?;
            let report = strip::strip_project(root, &config.modules, *dry_run)?;
            if cli.json {
                return print_json(&report);
            }
            for (path, removed) in &report.files {
                println!("   {} {} ({})", "stripped".yellow(), path.display(), removed);
            }
            ui::success(format!(
                "Removed {} directive lines from {} files",
                report.total(),
                report.files.len()
            ));
            Ok(())
        }

        Some(Commands::Changelog {
            dry_run,
            commit,
            skip_policy,
        }) => {
            let config = config::load_config(root)?;
            let opts = ChangelogOptions {
                dry_run: *dry_run,
                commit: *commit,
                skip_policy: *skip_policy,
            };
            let report = changelog::run(root, &config, &opts)?;
            if cli.json {
                return print_json(&report);
            }
            if let Some(hash) = &report.analysis.stopped_at {
                ui::warn(format!("Stopped at skip-marked commit {}", hash));
            }
            match (&report.next, &report.section) {
                (Some(next), Some(section)) => {
                    println!("{}", section.trim_end());
                    println!();
                    ui::success(format!("Bumping {} -> {}", report.current, next));
                    if let Some(message) = &report.committed {
                        ui::success(format!("Committed '{}'", message));
                    }
                }
                _ => ui::warn("No relevant changes detected. Skipping release."),
            }
            Ok(())
        }

        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }

        None => {
            print_splash();
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn slice_file(
    config: &ProjectConfig,
    file: &Path,
    lang: &str,
    version: Option<&str>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    config.require_language(lang)?;
    let target = version.map(|v| config.require_version(v)).transpose()?;
    let text =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let doc = engine::filter_document(&config.scanner()?, &text, lang, target.as_ref())
        .with_context(|| format!("Failed to filter {}", file.display()))?;
    if json {
        return print_json(&doc);
    }

    if doc.excluded {
        ui::warn(format!(
            "{} declares @since {} and is left out of this version",
            file.display(),
            doc.file_version.as_deref().unwrap_or("?")
        ));
    }
    print!("{}", doc.text());
    for diag in &doc.diagnostics {
        eprintln!("{}", ui::diagnostic(file, diag));
    }
    if verbose {
        for (line, fate) in &doc.fates {
            eprintln!("   {}:{} {:?}", file.display(), line, fate);
        }
    }
    Ok(())
}

fn synth_pair(
    config: &ProjectConfig,
    declaration: &Path,
    definition: &Path,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let read = |path: &Path| -> Result<PairSide> {
        let text = if path.exists() {
            Some(fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?)
        } else {
            None
        };
        Ok(PairSide {
            path: path.to_path_buf(),
            text,
        })
    };
    let name = match name {
        Some(n) => n.to_string(),
        None => declaration
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .context("Cannot derive a module name from the declaration; pass --name")?,
    };
    let pair = ModulePair {
        name,
        declaration: read(declaration)?,
        definition: read(definition)?,
    };

    let scanner = config.scanner()?;
    let whitelist = config.whitelist()?;
    let unit = Synthesizer::new(&scanner, &whitelist)
        .include_untagged(config.modules.include_untagged)
        .synthesize(&pair)?;
    if json {
        return print_json(&unit);
    }
    print!("{}", unit.render());
    for diag in &unit.diagnostics {
        eprintln!("{}", ui::diagnostic(Path::new(&unit.name), diag));
    }
    Ok(())
}

fn print_splash() {
    println!();
    println!("   {}", "┌─┐┌─┐┬  ┬┌─┐┌─┐".cyan());
    println!("   {}", "└─┐├─┘│  ││  ├┤ ".cyan());
    println!("   {}", "└─┘┴  ┴─┘┴└─┘└─┘".cyan());
    println!();
    println!(
        "   {}",
        "Doc trees and C++ modules from annotated sources".dimmed().italic()
    );
    println!("   {}", format!("v{}", env!("CARGO_PKG_VERSION")).green());
    println!();

    let mut table = ui::Table::new(&["Category", "Commands"]);
    table.add_row(vec![
        "Start".bold().green().to_string(),
        format!("{}, {}", "init".cyan(), "guide".cyan()),
    ]);
    table.add_row(vec![
        "Pipelines".bold().yellow().to_string(),
        format!(
            "{}, {}, {}, {}",
            "docs".cyan(),
            "modules".cyan(),
            "watch".cyan(),
            "clean".cyan()
        ),
    ]);
    table.add_row(vec![
        "Inspect".bold().blue().to_string(),
        format!("{}, {}", "slice".cyan(), "synth".cyan()),
    ]);
    table.add_row(vec![
        "Release".bold().magenta().to_string(),
        format!(
            "{}, {}, {}",
            "c-compat".cyan(),
            "strip-tags".cyan(),
            "changelog".cyan()
        ),
    ]);
    table.print();
    println!();
    println!("   Run {} for detailed usage.", "splice --help".white().bold());
    println!();
}
