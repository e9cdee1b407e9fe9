//! Terminal output: status lines and summary tables.
//!
//! Status lines carry a leading glyph: `✓` success, `!` warning, `x` failure.
//! [`Table`] renders a box-drawn report that shrinks its widest columns to fit
//! the terminal.

use crate::engine::Diagnostic;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

pub fn success(msg: impl AsRef<str>) {
    println!("{} {}", "✓".green(), msg.as_ref());
}

pub fn warn(msg: impl AsRef<str>) {
    println!("{} {}", "!".yellow(), msg.as_ref());
}

pub fn fail(msg: impl AsRef<str>) {
    eprintln!("{} {}", "x".red(), msg.as_ref());
}

/// A recovered annotation problem, as `! path:line: kind: message`.
pub fn diagnostic(path: &Path, diag: &Diagnostic) -> String {
    format!(
        "{} {}:{}: {}: {}",
        "!".yellow(),
        path.display(),
        diag.line,
        diag.kind.label().yellow(),
        diag.message
    )
}

/// A bar over `len` parallel units; hidden when `visible` is false.
pub fn progress(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.magenta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("◜◠◝◞◡◟"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(msg.into());
    pb
}

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

const MIN_COLUMN: usize = 8;

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are ignored.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        let (_, width) = console::Term::stdout().size();
        print!("{}", self.render(width as usize));
    }

    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.fit_widths(max_width);

        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, segments.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut s = String::from("  │");
            for (cell, &width) in cells.iter().zip(&widths) {
                let shown = console::truncate_str(&flatten(cell), width, "...").to_string();
                let pad = width.saturating_sub(console::measure_text_width(&shown));
                let shown = if bold { shown.bold().to_string() } else { shown };
                s.push_str(&format!(" {}{} │", shown, " ".repeat(pad)));
            }
            s.push('\n');
            s
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }

    /// Natural column widths, with the widest column shaved one cell at a time
    /// (never below 8) until the table fits.
    fn fit_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(console::measure_text_width(&flatten(cell)));
            }
        }

        let overhead = 3 + 3 * widths.len();
        let budget = max_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > budget {
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if widest <= MIN_COLUMN {
                break;
            }
            widths[idx] -= 1;
        }
        widths
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}
