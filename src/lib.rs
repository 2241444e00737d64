//! # Inkpress
//!
//! A small static blog generator. Markdown posts and handlebars templates go
//! in, one self-contained HTML file per post plus an index come out, each with
//! exactly the CSS it uses inlined.
//!
//! # Pipeline
//!
//! ```text
//! posts/*.md ──▶ Post ──▶ PageJob queue ──▶ render ▶ reduce CSS ▶ render ▶ minify ──▶ dist/*.html
//! styles.scss ─▶ compiled sheet ──────────────────────┘
//! avatar URL ──▶ fetch ▶ sha256 ▶ tmp/<hash>/ ─────────────────────────────────────▶ dist/images/
//! ```
//!
//! Pages are built strictly one after another; the avatar is fetched and
//! resized on a separate thread meanwhile.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`post`] | `YYYY-MM-DD-slug.md` → [`post::Post`]: title, intro, body |
//! | [`markdown`] | Markdown → sanitized HTML with highlighted code; `strip_tags` |
//! | [`templates`] | Template store and handlebars renderer |
//! | [`styles`] | Stylesheet compilation (grass) plus the code theme |
//! | [`css`] | Used-CSS reduction and vendor prefixing (lightningcss, lol_html) |
//! | [`minify`] | Whitespace minification that leaves `<pre>` alone |
//! | [`pages`] | Page jobs and the two-pass page pipeline |
//! | [`cache`] | Content-addressed avatar cache and its index |
//! | [`imaging`] | Pure-Rust square crops and JPEG encoding |
//! | [`avatar`] | Avatar fetch, cache lookup and derivative generation |
//! | [`site`] | The build driver |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Per-Page CSS
//!
//! Every page gets its own `<style>` block holding only the rules that match
//! its markup. The site stays a set of single files with no external requests,
//! and a page never ships the index's or another post's styles.
//!
//! ## Two Renders
//!
//! The reduction needs the final markup, and the final markup needs the CSS.
//! Each page is therefore rendered once without styles to learn what it uses,
//! and once more with them.
//!
//! ## Content-Addressed Avatar Cache
//!
//! Derivatives are keyed by the hash of the downloaded bytes and published by
//! an atomic rename, so a half-written cache entry is never visible. A small
//! index lets repeated builds skip the download altogether.

pub mod avatar;
pub mod cache;
pub mod config;
pub mod css;
pub mod imaging;
pub mod markdown;
pub mod minify;
pub mod output;
pub mod pages;
pub mod post;
pub mod site;
pub mod styles;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_helpers;
