//! Blog post parsing.
//!
//! A post is a markdown file named `YYYY-MM-DD-slug.ext`:
//!
//! ```text
//! # Title line
//! Intro paragraph(s), shown on the index page.
//!
//!
//! Body, shown on the post page only. The intro ends at the first run of
//! three newlines (two blank lines).
//! ```
//!
//! [`split_document`] is the small grammar for the file contents,
//! [`parse_file_name`] the one for the name. Both reject input that does not
//! follow the convention instead of producing garbage.

use crate::markdown::{strip_tags, to_html};
use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const INTRO_SEPARATOR: &str = "\n\n\n";

#[derive(Error, Debug)]
pub enum PostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid post file name '{0}': expected YYYY-MM-DD-slug.ext")]
    InvalidFileName(String),
    #[error("post '{0}' does not start with a '#' title line")]
    MissingTitle(String),
}

/// One blog entry. Built once per source file, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub slug: String,
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    /// Plain-text title.
    pub title: String,
    /// Plain-text form of the intro, for meta tags.
    pub description: String,
    /// Rendered intro HTML.
    pub intro: String,
    /// Rendered body HTML.
    pub content: String,
}

/// Date parts as templates see them: `{ day, month, year, iso }`.
#[derive(Serialize)]
struct DateParts {
    day: u32,
    month: String,
    year: i32,
    iso: String,
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    DateParts {
        day: date.day(),
        month: date.format("%b").to_string(),
        year: date.year(),
        iso: date.format("%Y-%m-%d").to_string(),
    }
    .serialize(serializer)
}

/// The three raw markdown sections of a post file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections<'a> {
    pub title: &'a str,
    pub intro: &'a str,
    pub body: &'a str,
}

/// Split a post into title, intro and body.
///
/// - The first line must be a heading; its `#` marker and the whitespace after
///   it are removed.
/// - The intro runs from the end of the title line to the first `\n\n\n`.
///   Without a separator the whole remainder is the intro and the body is empty.
///
/// Expects `\n` line endings. Returns `None` when there is no title line.
pub fn split_document(text: &str) -> Option<Sections<'_>> {
    let (first_line, rest) = match text.find('\n') {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    };
    let marker = first_line.trim_start_matches('#');
    if marker.len() == first_line.len() {
        return None;
    }
    let title = marker.trim();

    // The separator may start right at the title line's own newline.
    let (intro, body) = match rest.find(INTRO_SEPARATOR) {
        Some(pos) => (&rest[..pos], &rest[pos + INTRO_SEPARATOR.len()..]),
        None => (rest, ""),
    };

    Some(Sections {
        title,
        intro: intro.trim(),
        body: body.trim(),
    })
}

/// Split `YYYY-MM-DD-slug.ext` into its date and slug.
pub fn parse_file_name(file_name: &str) -> Result<(NaiveDate, String), PostError> {
    let invalid = || PostError::InvalidFileName(file_name.to_string());

    let date_part = file_name.get(..10).ok_or_else(invalid)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())?;

    let rest = file_name.get(10..).ok_or_else(invalid)?;
    let slug = rest
        .strip_prefix('-')
        .ok_or_else(invalid)?
        .split('.')
        .next()
        .unwrap_or("");
    if slug.is_empty() {
        return Err(invalid());
    }

    Ok((date, slug.to_string()))
}

impl Post {
    /// Parse one post from its file name and contents.
    pub fn parse(file_name: &str, text: &str) -> Result<Self, PostError> {
        let (date, slug) = parse_file_name(file_name)?;
        let text = text.replace("\r\n", "\n");
        let sections =
            split_document(&text).ok_or_else(|| PostError::MissingTitle(file_name.to_string()))?;

        let intro = to_html(sections.intro);
        Ok(Post {
            slug,
            date,
            title: strip_tags(&to_html(sections.title)),
            description: strip_tags(&intro),
            intro,
            content: to_html(sections.body),
        })
    }
}

/// Load every post in `dir`, newest first.
///
/// Files are ordered by name, descending, which is newest first because every
/// name starts with its date. Hidden files are skipped.
pub fn load_posts(dir: &Path) -> Result<Vec<Post>, PostError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| !n.to_string_lossy().starts_with('.'))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    files.reverse();

    let mut posts = Vec::with_capacity(files.len());
    for path in &files {
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let text = fs::read_to_string(path)?;
        posts.push(Post::parse(&file_name, &text)?);
    }
    Ok(posts)
}
