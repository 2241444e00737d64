//! CLI output formatting.
//!
//! # Output Format
//!
//! ```text
//! Pages
//! 001 latest-news → latest-news.html
//! 002 hello-world → hello-world.html
//! 003 index → index.html
//!
//! Images (cached)
//!     images/profile-64.jpg
//!     images/profile-128.jpg
//!
//! Built 3 pages, 2 images → dist
//! ```
//!
//! [`format_build_summary`] returns lines for testability; [`print_build_summary`]
//! writes them to stdout.

use crate::site::BuildSummary;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `base` when possible, for display.
fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn format_build_summary(summary: &BuildSummary) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for (i, page) in summary.pages.iter().enumerate() {
        let key = page
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            key,
            relative(page, &summary.output_dir)
        ));
    }

    lines.push(String::new());
    match summary.avatar {
        Some(outcome) => lines.push(format!("Images ({outcome})")),
        None => lines.push("Images (none)".to_string()),
    }
    for image in &summary.images {
        lines.push(format!("{}{}", indent(1), relative(image, &summary.output_dir)));
    }

    lines.push(String::new());
    lines.push(format!(
        "Built {}, {} → {}",
        plural(summary.pages.len(), "page"),
        plural(summary.images.len(), "image"),
        summary.output_dir.display()
    ));
    lines
}

pub fn print_build_summary(summary: &BuildSummary) {
    for line in format_build_summary(summary) {
        println!("{}", line);
    }
}
