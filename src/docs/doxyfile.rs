//! Doxyfile template injection and doxygen execution.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Output};

pub const GENERATED_DOXYFILE: &str = "Doxyfile.in";

/// Values substituted into the template for one (language, version) tree.
#[derive(Debug, Clone)]
pub struct DoxyVars<'a> {
    pub lib_name: &'a str,
    pub suffixes: &'a [String],
    pub graphviz_bin: &'a str,
    pub language: &'a str,
    pub version: &'a str,
}

/// English name doxygen expects for `OUTPUT_LANGUAGE`.
pub fn full_language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "zh" => "Chinese",
        "jp" => "Japanese",
        other => other,
    }
}

pub fn render(template: &str, vars: &DoxyVars<'_>) -> String {
    let patterns = vars
        .suffixes
        .iter()
        .map(|s| format!("*.{}", s))
        .collect::<Vec<_>>()
        .join(" ");

    template
        .replace("%LIB_NAME%", vars.lib_name)
        .replace("%PATTERNS%", &patterns)
        .replace("%GRAPHVIZ_BIN%", vars.graphviz_bin)
        .replace("%FULL_LAN%", full_language_name(vars.language))
        .replace("%LAN%", vars.language)
        .replace("%VER%", vars.version)
}

pub fn doxygen_available() -> bool {
    Command::new("doxygen").arg("--version").output().is_ok()
}

/// Run `doxygen Doxyfile.in` inside a version directory.
pub fn run_doxygen(version_dir: &Path) -> Result<Output> {
    Command::new("doxygen")
        .arg(GENERATED_DOXYFILE)
        .current_dir(version_dir)
        .output()
        .with_context(|| format!("Failed to run doxygen in {}", version_dir.display()))
}
