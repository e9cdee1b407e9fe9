//! `splice.toml` parsing and validation.
//!
//! The file is read once, validated, and the resulting [`ProjectConfig`] is
//! passed by reference to every command. Nothing reads it from a global.

use crate::changelog::SkipPolicy;
use crate::engine::{DEFAULT_MARKER, DocVersion, TagScanner, Whitelist};
use crate::error::{SpliceError, SpliceResult};
use crate::modules::pairs::MODULE_SUFFIXES;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "splice.toml";

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct ProjectConfig {
    pub package: PackageConfig,
    pub docs: DocsConfig,
    pub modules: ModulesConfig,
    pub changelog: ChangelogConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PackageConfig {
    pub name: String,
    pub version: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: "0.1.0".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DocsConfig {
    pub languages: Vec<String>,
    pub versions: Vec<String>,
    pub folders: Vec<PathBuf>,
    pub suffixes: Vec<String>,
    pub output: PathBuf,
    pub doxyfile: PathBuf,
    pub graphviz_bin: String,
    pub images: Option<PathBuf>,
    pub doxygen_images: Option<PathBuf>,
    pub sphinx_images: Option<PathBuf>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            versions: Vec::new(),
            folders: vec![PathBuf::from("include")],
            suffixes: vec!["hpp".to_string(), "h".to_string()],
            output: PathBuf::from("docs/doxygen/build"),
            doxyfile: PathBuf::from("Doxyfile"),
            graphviz_bin: String::new(),
            images: None,
            doxygen_images: None,
            sphinx_images: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ModulesConfig {
    pub generate_inplace: bool,
    pub marker: String,
    pub declaration_dir: PathBuf,
    pub definition_dir: PathBuf,
    pub declaration_suffix: String,
    pub definition_suffix: String,
    pub module_suffix: String,
    pub std_modules: Vec<String>,
    pub user_modules: Vec<String>,
    /// Merge blocks carrying neither `@exporter` nor `@attacher`.
    pub include_untagged: bool,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            generate_inplace: true,
            marker: DEFAULT_MARKER.to_string(),
            declaration_dir: PathBuf::from("include"),
            definition_dir: PathBuf::from("src"),
            declaration_suffix: "hpp".to_string(),
            definition_suffix: "cpp".to_string(),
            module_suffix: default_module_suffix().to_string(),
            std_modules: Vec::new(),
            user_modules: Vec::new(),
            include_untagged: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ChangelogConfig {
    pub skip_marker: String,
    pub release_prefix: String,
    pub skip_policy: SkipPolicy,
    pub file: PathBuf,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            skip_marker: "[skip ci]".to_string(),
            release_prefix: "chore(release):".to_string(),
            skip_policy: SkipPolicy::default(),
            file: PathBuf::from("CHANGELOG.md"),
        }
    }
}

fn default_module_suffix() -> &'static str {
    if cfg!(windows) { "ixx" } else { "cppm" }
}

/// Write a starter `splice.toml`. Refuses to overwrite an existing one.
pub fn init_config(root: &Path, name: &str) -> Result<PathBuf> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let text = format!(
        r#"[package]
name = "{name}"
version = "0.1.0"

[docs]
languages = ["en"]
versions = ["0.1"]
folders = ["include"]
suffixes = ["hpp", "h"]
output = "docs/doxygen/build"
doxyfile = "Doxyfile"
graphviz_bin = ""

[modules]
generate_inplace = true
marker = "{marker}"
std_modules = []
user_modules = ["{name}"]

[changelog]
skip_marker = "[skip ci]"
release_prefix = "chore(release):"
skip_policy = "stop-after-releasable"
"#,
        name = name,
        marker = DEFAULT_MARKER
    );
    parse_config(&text).context("Project name is not usable as a module name")?;
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Load and validate `splice.toml` from `root`.
pub fn load_config(root: &Path) -> Result<ProjectConfig> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "{} not found in {}.\n\n\
            💡 Tip: Create one with a [package] table, e.g. name = \"mylib\".",
            CONFIG_FILE,
            root.display()
        ));
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {} - check file permissions", path.display()))?;
    let config = parse_config(&text)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(text: &str) -> SpliceResult<ProjectConfig> {
    let config: ProjectConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

impl ProjectConfig {
    /// Every check that must pass before any output is written.
    pub fn validate(&self) -> SpliceResult<()> {
        if self.package.name.trim().is_empty() {
            return Err(SpliceError::config("[package].name must not be empty"));
        }
        semver::Version::parse(&self.package.version).map_err(|e| {
            SpliceError::config(format!(
                "[package].version '{}' is not semver: {}",
                self.package.version, e
            ))
        })?;

        if self.docs.languages.is_empty() {
            return Err(SpliceError::config("[docs].languages must name at least one language"));
        }
        let mut seen = HashSet::new();
        for code in &self.docs.languages {
            let valid = !code.is_empty() && code.chars().all(|c| c.is_ascii_lowercase());
            if !valid {
                return Err(SpliceError::config(format!(
                    "language code '{}' must be lowercase ASCII letters",
                    code
                )));
            }
            if !seen.insert(code) {
                return Err(SpliceError::config(format!("language '{}' listed twice", code)));
            }
        }
        self.doc_versions()?;

        let modules = &self.modules;
        if modules.module_suffix.trim().is_empty() {
            return Err(SpliceError::config("[modules].module_suffix must not be empty"));
        }
        // generated units are written beside, and deleted from, the sources
        for (key, source) in [
            ("declaration_suffix", &modules.declaration_suffix),
            ("definition_suffix", &modules.definition_suffix),
        ] {
            if *source == modules.module_suffix || MODULE_SUFFIXES.contains(&source.as_str()) {
                return Err(SpliceError::config(format!(
                    "[modules].{} '{}' collides with the module unit suffix",
                    key, source
                )));
            }
        }
        if self.changelog.skip_marker.trim().is_empty() {
            return Err(SpliceError::config("[changelog].skip_marker must not be empty"));
        }
        self.scanner()?;
        self.whitelist()?;
        Ok(())
    }

    pub fn doc_versions(&self) -> SpliceResult<Vec<DocVersion>> {
        self.docs
            .versions
            .iter()
            .map(|raw| {
                raw.parse::<DocVersion>()
                    .map_err(|e| SpliceError::config(format!("[docs].versions: {}", e)))
            })
            .collect()
    }

    pub fn require_language(&self, code: &str) -> SpliceResult<()> {
        if self.docs.languages.iter().any(|l| l == code) {
            Ok(())
        } else {
            Err(SpliceError::config(format!(
                "language '{}' is not configured (known: {})",
                code,
                self.docs.languages.join(", ")
            )))
        }
    }

    /// A requested version, which must be one of the configured ones.
    pub fn require_version(&self, raw: &str) -> SpliceResult<DocVersion> {
        let wanted: DocVersion = raw.parse().map_err(SpliceError::config)?;
        if self.doc_versions()?.contains(&wanted) {
            Ok(wanted)
        } else {
            Err(SpliceError::config(format!(
                "version '{}' is not configured (known: {})",
                raw,
                self.docs.versions.join(", ")
            )))
        }
    }

    pub fn scanner(&self) -> SpliceResult<TagScanner> {
        TagScanner::new(&self.modules.marker, &self.docs.languages)
    }

    pub fn whitelist(&self) -> SpliceResult<Whitelist> {
        Whitelist::new(
            &self.modules.std_modules,
            &self.modules.user_modules,
            &self.modules.declaration_suffix,
        )
    }
}
