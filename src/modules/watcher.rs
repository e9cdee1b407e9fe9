use super::{ModulesOptions, generate, pairs, print_report};
use crate::config::ProjectConfig;
use anyhow::Result;
use colored::*;
use notify::{Config, Event, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Duration;

/// True when an event touches something other than the units we write
/// ourselves; reacting to those would regenerate forever.
pub fn is_source_change(event: &Event, module_suffix: &str) -> bool {
    event
        .paths
        .iter()
        .any(|p| !pairs::is_generated_module(p, module_suffix))
}

pub fn watch(root: &Path, config: &ProjectConfig, verbose: bool) -> Result<()> {
    let decl_dir = root.join(&config.modules.declaration_dir);
    let def_dir = root.join(&config.modules.definition_dir);
    println!(
        "{} Watching {} and {} for changes...",
        "👀".cyan(),
        decl_dir.display(),
        def_dir.display()
    );

    let (tx, rx) = channel();
    let notify_config = Config::default().with_poll_interval(Duration::from_secs(1));
    let mut watcher = notify::RecommendedWatcher::new(tx, notify_config)?;
    for dir in [&decl_dir, &def_dir] {
        if dir.exists() {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }
    }

    regenerate(root, config, verbose);

    let suffix = config.modules.module_suffix.as_str();
    while let Ok(event) = rx.recv() {
        let mut relevant = matches!(&event, Ok(e) if is_source_change(e, suffix));
        // drain the burst an editor save produces
        std::thread::sleep(Duration::from_millis(100));
        while let Ok(next) = rx.try_recv() {
            relevant |= matches!(&next, Ok(e) if is_source_change(e, suffix));
        }
        if relevant {
            regenerate(root, config, verbose);
        }
    }
    Ok(())
}

fn regenerate(root: &Path, config: &ProjectConfig, verbose: bool) {
    println!("{} Sources changed. Regenerating modules...", "🔄".yellow());
    let opts = ModulesOptions {
        dry_run: false,
        show_progress: true,
    };
    match generate(root, config, &opts) {
        Ok(report) => print_report(&report, verbose),
        Err(e) => println!("{} Error: {:#}", "x".red(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use notify::event::{CreateKind, ModifyKind};
    use std::path::PathBuf;

    #[test]
    fn test_generated_units_do_not_retrigger() {
        let ours = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("src/net.cppm"));
        assert!(!is_source_change(&ours, "cppm"));

        let edit = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("src/net.cppm"))
            .add_path(PathBuf::from("include/net.hpp"));
        assert!(is_source_change(&edit, "cppm"));

        let custom = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("src/net.mpp"));
        assert!(!is_source_change(&custom, "mpp"));
        assert!(is_source_change(&custom, "cppm"));
    }
}
