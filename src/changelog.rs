//! Conventional-commit changelog and version bump.
//!
//! History is read newest first from HEAD down to (excluding) the last
//! release commit. Each commit gets a level: 3 breaking, 2 feature, 1 fix or
//! performance, 0 anything else. The highest level decides the bump.

use crate::config::{CONFIG_FILE, ProjectConfig};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use git2::{Repository, Sort};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static BREAKING_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+(\([^)]*\))?!:").expect("valid regex"));
static TYPED_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(feat|fix|perf)(\([^)]*\))?:").expect("valid regex"));
static VERSION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\s*version\s*=\s*)"[^"]*"(.*)$"#).expect("valid regex"));

/// What to do with a commit carrying the skip marker.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SkipPolicy {
    /// Skip it while nothing releasable has been seen; stop the scan at it
    /// once something has.
    #[default]
    StopAfterReleasable,
    /// Always skip it and keep scanning.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Category {
    Breaking,
    Features,
    BugFixes,
    Performance,
    Others,
}

impl Category {
    pub const ORDER: [Category; 5] = [
        Category::Breaking,
        Category::Features,
        Category::BugFixes,
        Category::Performance,
        Category::Others,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Category::Breaking => "Breaking Changes",
            Category::Features => "Features",
            Category::BugFixes => "Bug Fixes",
            Category::Performance => "Performance Improvements",
            Category::Others => "Others",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub short_hash: String,
    pub message: String,
}

impl CommitInfo {
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub category: Category,
    pub subject: String,
    pub hash: String,
}

/// Level and category of one commit message.
pub fn classify(message: &str) -> (u8, Category) {
    let subject = message.lines().next().unwrap_or("").trim();
    if message.contains("BREAKING CHANGE") || BREAKING_SUBJECT.is_match(subject) {
        return (3, Category::Breaking);
    }
    match TYPED_SUBJECT.captures(subject).and_then(|c| c.get(1)) {
        Some(t) if t.as_str() == "feat" => (2, Category::Features),
        Some(t) if t.as_str() == "fix" => (1, Category::BugFixes),
        Some(_) => (1, Category::Performance),
        None => (0, Category::Others),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Analysis {
    pub level: u8,
    pub entries: Vec<Entry>,
    pub skipped: usize,
    /// Hash of the skip-marked commit the scan stopped at.
    pub stopped_at: Option<String>,
}

/// Classify `commits` (newest first). An empty `skip_marker` marks nothing.
pub fn analyze(commits: &[CommitInfo], skip_marker: &str, policy: SkipPolicy) -> Analysis {
    let mut analysis = Analysis::default();

    for commit in commits {
        if commit.message.trim().is_empty() {
            continue;
        }
        if !skip_marker.is_empty() && commit.message.contains(skip_marker) {
            if policy == SkipPolicy::StopAfterReleasable && analysis.level > 0 {
                analysis.stopped_at = Some(commit.short_hash.clone());
                break;
            }
            analysis.skipped += 1;
            continue;
        }

        let (level, category) = classify(&commit.message);
        analysis.level = analysis.level.max(level);
        analysis.entries.push(Entry {
            category,
            subject: commit.subject().to_string(),
            hash: commit.short_hash.clone(),
        });
    }
    analysis
}

/// The next version for a bump level; `None` when nothing is releasable.
pub fn bump(current: &Version, level: u8) -> Option<Version> {
    match level {
        0 => None,
        1 => Some(Version::new(current.major, current.minor, current.patch + 1)),
        2 => Some(Version::new(current.major, current.minor + 1, 0)),
        _ => Some(Version::new(current.major + 1, 0, 0)),
    }
}

pub fn render(version: &Version, date: NaiveDate, entries: &[Entry]) -> String {
    let mut out = format!("## [{}] - {}\n\n", version, date.format("%Y-%m-%d"));
    for category in Category::ORDER {
        let items: Vec<String> = entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| format!("- {} ({})", e.subject, e.hash))
            .collect();
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("**{}**\n", category.title()));
        out.push_str(&items.join("\n"));
        out.push_str("\n\n");
    }
    out
}

/// Replace `version` inside the `[package]` table; `None` if there is none.
pub fn rewrite_version(toml_text: &str, version: &Version) -> Option<String> {
    let mut in_package = false;
    let mut replaced = false;
    let mut out: Vec<String> = Vec::new();

    for line in toml_text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_package = trimmed == "[package]";
        }
        if in_package
            && !replaced
            && let Some(caps) = VERSION_LINE.captures(line)
        {
            out.push(format!("{}\"{}\"{}", &caps[1], version, &caps[2]));
            replaced = true;
            continue;
        }
        out.push(line.to_string());
    }

    if !replaced {
        return None;
    }
    let mut text = out.join("\n");
    if toml_text.ends_with('\n') {
        text.push('\n');
    }
    Some(text)
}

/// Commits from HEAD back to, not including, the last one whose subject
/// starts with `release_prefix`.
pub fn read_history(repo: &Repository, release_prefix: &str) -> Result<Vec<CommitInfo>> {
    let mut walk = repo.revwalk()?;
    walk.push_head().context("Repository has no commits")?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut commits = Vec::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        let message = commit.message().unwrap_or("").to_string();
        if message.trim_start().starts_with(release_prefix) {
            break;
        }
        let id = commit.id().to_string();
        commits.push(CommitInfo {
            short_hash: id.chars().take(7).collect(),
            message,
        });
    }
    Ok(commits)
}

#[derive(Debug, Clone, Default)]
pub struct ChangelogOptions {
    pub dry_run: bool,
    pub commit: bool,
    pub skip_policy: Option<SkipPolicy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangelogReport {
    pub current: String,
    pub next: Option<String>,
    pub analysis: Analysis,
    pub section: Option<String>,
    pub committed: Option<String>,
}

pub fn run(root: &Path, config: &ProjectConfig, opts: &ChangelogOptions) -> Result<ChangelogReport> {
    let repo = Repository::discover(root)
        .with_context(|| format!("No git repository found at {}", root.display()))?;
    let current = Version::parse(&config.package.version)
        .with_context(|| format!("[package].version '{}' is not semver", config.package.version))?;

    let commits = read_history(&repo, &config.changelog.release_prefix)?;
    let policy = opts.skip_policy.unwrap_or(config.changelog.skip_policy);
    let analysis = analyze(&commits, &config.changelog.skip_marker, policy);

    let mut report = ChangelogReport {
        current: current.to_string(),
        next: None,
        analysis,
        section: None,
        committed: None,
    };
    let Some(next) = bump(&current, report.analysis.level) else {
        return Ok(report);
    };

    let section = render(&next, chrono::Local::now().date_naive(), &report.analysis.entries);
    report.next = Some(next.to_string());
    report.section = Some(section.clone());
    if opts.dry_run {
        return Ok(report);
    }

    let changelog_path = root.join(&config.changelog.file);
    let existing = if changelog_path.exists() {
        fs::read_to_string(&changelog_path)
            .with_context(|| format!("Failed to read {}", changelog_path.display()))?
    } else {
        String::new()
    };
    fs::write(&changelog_path, format!("{}{}", section, existing))
        .with_context(|| format!("Failed to write {}", changelog_path.display()))?;

    let config_path = root.join(CONFIG_FILE);
    let toml_text = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let updated = rewrite_version(&toml_text, &next)
        .with_context(|| format!("No version line in the [package] table of {}", CONFIG_FILE))?;
    fs::write(&config_path, updated)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    if opts.commit {
        let message = format!(
            "{} {} {}",
            config.changelog.release_prefix, next, config.changelog.skip_marker
        );
        commit_release(&repo, &[config_path.as_path(), changelog_path.as_path()], &message)?;
        report.committed = Some(message);
    }
    Ok(report)
}

fn commit_release(repo: &Repository, files: &[&Path], message: &str) -> Result<()> {
    let workdir = repo
        .workdir()
        .context("Cannot commit in a bare repository")?
        .canonicalize()?;
    let mut index = repo.index()?;
    for &file in files {
        let absolute = file
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", file.display()))?;
        let relative = absolute
            .strip_prefix(&workdir)
            .with_context(|| format!("{} is outside the repository", file.display()))?;
        index.add_path(relative)?;
    }
    index.write()?;

    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = repo.signature().context("Set git user.name and user.email to commit")?;
    let parent = repo.head()?.peel_to_commit()?;
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
    Ok(())
}
