//! Per-page CSS: used-CSS reduction and post-processing.
//!
//! ## Reduction
//!
//! The full stylesheet is parsed with lightningcss in strict mode. Every
//! distinct selector is tested against the rendered page with lol_html; style
//! rules keep only the selectors that matched and disappear when none did.
//! `@media` and `@supports` blocks are reduced recursively and dropped once
//! empty. Every other at-rule (`@font-face`, `@keyframes`, …) is kept.
//!
//! Dynamic pseudo-classes and pseudo-elements (`:hover`, `::before`, …) cannot
//! be matched against static markup, so they are removed before matching:
//! `a:hover` is kept when the page has an `a`. A selector that is empty after
//! that (`::selection`, `:root`) or that lol_html cannot express (sibling
//! combinators, attribute namespaces) is kept.
//!
//! ## Post-processing
//!
//! [`post_process`] adds vendor prefixes for the configured browserslist
//! targets and minifies.

use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::selector::Selector;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use regex::Regex;
use std::cell::Cell;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use thiserror::Error;

/// Pseudo-classes lol_html can evaluate against static markup.
const STRUCTURAL_PSEUDO: &[&str] = &["first-child", "nth-child", "first-of-type", "nth-of-type", "not"];

/// A pseudo-class or pseudo-element, or an attribute selector that is skipped
/// whole so colons inside its value are left alone.
static PSEUDO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\[(?:"[^"]*"|'[^']*'|[^\]"'])*\])|(::?)([A-Za-z-]+)(\([^)]*\))?"#).unwrap()
});

#[derive(Error, Debug)]
pub enum CssError {
    #[error("failed to parse stylesheet: {0}")]
    Parse(String),
    #[error("failed to match selectors against page markup: {0}")]
    Markup(String),
    #[error("failed to minify stylesheet: {0}")]
    Minify(String),
    #[error("failed to print stylesheet: {0}")]
    Print(String),
    #[error("invalid browser targets: {0}")]
    Targets(String),
}

/// Computes the part of a stylesheet a page actually uses.
pub trait CssReducer {
    fn reduce(&self, html: &str, css: &str) -> Result<String, CssError>;
}

/// The production reducer, see the [module docs](self).
#[derive(Debug, Clone, Copy, Default)]
pub struct UsedCssReducer;

impl CssReducer for UsedCssReducer {
    fn reduce(&self, html: &str, css: &str) -> Result<String, CssError> {
        reduce_unused(html, css)
    }
}

/// Drop every rule of `css` whose selectors match nothing in `html`.
pub fn reduce_unused(html: &str, css: &str) -> Result<String, CssError> {
    let mut sheet =
        StyleSheet::parse(css, ParserOptions::default()).map_err(|e| CssError::Parse(e.to_string()))?;

    let mut candidates = BTreeSet::new();
    collect_selectors(&sheet.rules, &mut candidates);
    let used = used_selectors(html, &candidates)?;
    retain_used(&mut sheet.rules, &used);

    let printed = sheet
        .to_css(PrinterOptions::default())
        .map_err(|e| CssError::Print(e.to_string()))?;
    Ok(printed.code)
}

fn selector_key(selector: &Selector<'_>) -> Option<String> {
    selector.to_css_string(PrinterOptions::default()).ok()
}

fn collect_selectors(rules: &CssRuleList<'_>, out: &mut BTreeSet<String>) {
    for rule in &rules.0 {
        match rule {
            CssRule::Style(style) => out.extend(style.selectors.0.iter().filter_map(selector_key)),
            CssRule::Media(media) => collect_selectors(&media.rules, out),
            CssRule::Supports(supports) => collect_selectors(&supports.rules, out),
            _ => {}
        }
    }
}

fn retain_used(rules: &mut CssRuleList<'_>, used: &HashSet<String>) {
    rules.0.retain_mut(|rule| match rule {
        CssRule::Style(style) => {
            style
                .selectors
                .0
                .retain(|s| selector_key(s).is_none_or(|key| used.contains(&key)));
            !style.selectors.0.is_empty()
        }
        CssRule::Media(media) => {
            retain_used(&mut media.rules, used);
            !media.rules.0.is_empty()
        }
        CssRule::Supports(supports) => {
            retain_used(&mut supports.rules, used);
            !supports.rules.0.is_empty()
        }
        _ => true,
    });
}

/// Remove pseudo-classes and pseudo-elements that depend on user interaction
/// or generated content.
fn strip_dynamic_pseudo(selector: &str) -> String {
    PSEUDO
        .replace_all(selector, |caps: &regex::Captures| {
            if caps.get(1).is_some() {
                return caps[0].to_string();
            }
            let structural = &caps[2] == ":" && STRUCTURAL_PSEUDO.contains(&&caps[3].to_ascii_lowercase()[..]);
            if structural {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .trim()
        .to_string()
}

/// Returns the subset of `candidates` to keep for this page.
fn used_selectors(html: &str, candidates: &BTreeSet<String>) -> Result<HashSet<String>, CssError> {
    let mut keep = HashSet::new();
    let mut probes: Vec<(&String, String)> = Vec::new();

    for candidate in candidates {
        let matchable = strip_dynamic_pseudo(candidate);
        if matchable.is_empty() || matchable.parse::<lol_html::Selector>().is_err() {
            keep.insert(candidate.clone());
        } else {
            probes.push((candidate, matchable));
        }
    }

    let hits: Vec<Cell<bool>> = probes.iter().map(|_| Cell::new(false)).collect();
    let handlers = probes
        .iter()
        .zip(&hits)
        .map(|((_, matchable), hit)| {
            element!(matchable.as_str(), move |_| {
                hit.set(true);
                Ok(())
            })
        })
        .collect();

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| CssError::Markup(e.to_string()))?;

    for ((candidate, _), hit) in probes.iter().zip(&hits) {
        if hit.get() {
            keep.insert((*candidate).clone());
        }
    }
    Ok(keep)
}

/// Resolve browserslist queries. No queries means no prefixing.
pub fn browser_targets(queries: &[String]) -> Result<Targets, CssError> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| CssError::Targets(e.to_string()))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Add vendor prefixes for `targets`, then minify.
pub fn post_process(css: &str, targets: &Targets) -> Result<String, CssError> {
    let mut sheet =
        StyleSheet::parse(css, ParserOptions::default()).map_err(|e| CssError::Parse(e.to_string()))?;
    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| CssError::Minify(e.to_string()))?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets: targets.clone(),
            ..PrinterOptions::default()
        })
        .map_err(|e| CssError::Print(e.to_string()))?;
    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><div class="a"><p class="b">hi</p><a href="/">home</a></div></body></html>"#;

    #[test]
    fn unused_class_is_removed() {
        let css = ".a{color:red}.b{color:blue}.c{color:green}";
        let reduced = reduce_unused(PAGE, css).unwrap();
        assert!(reduced.contains(".a"));
        assert!(reduced.contains(".b"));
        assert!(!reduced.contains(".c"));
        assert!(!reduced.contains("green"));
    }

    #[test]
    fn selector_lists_are_pruned() {
        let reduced = reduce_unused(PAGE, ".a, .c { margin: 0 }").unwrap();
        assert!(reduced.contains(".a"));
        assert!(!reduced.contains(".c"));
    }

    #[test]
    fn descendant_selectors_match_structure() {
        let reduced = reduce_unused(PAGE, ".a .b{top:0}.b .a{left:0}").unwrap();
        assert!(reduced.contains("top"));
        assert!(!reduced.contains("left"));
    }

    #[test]
    fn media_blocks_are_reduced_and_dropped() {
        let css = "@media (max-width: 600px) { .a { color: red } .c { color: blue } } @media print { .c { display: none } }";
        let reduced = reduce_unused(PAGE, css).unwrap();
        assert!(reduced.contains("600px"), "got {reduced}");
        assert!(reduced.contains(".a"));
        assert!(!reduced.contains(".c"));
        assert!(!reduced.contains("print"));
    }

    #[test]
    fn dynamic_pseudo_matches_base_selector() {
        let css = "a:hover{color:red}.c:hover{color:blue}.b::before{content:'x'}";
        let reduced = reduce_unused(PAGE, css).unwrap();
        assert!(reduced.contains("a:hover"));
        assert!(!reduced.contains(".c"));
        // lightningcss prints the legacy single-colon form.
        assert!(reduced.contains(".b:before"), "got {reduced}");
    }

    #[test]
    fn colons_inside_attribute_values_are_not_pseudos() {
        let page = r#"<p><a href="mailto:x:y">mail</a></p>"#;
        let reduced = reduce_unused(page, r#"a[href$="x:y"]{color:red}a[href^='tel:']{color:blue}"#).unwrap();
        assert!(reduced.contains("x:y"), "got {reduced}");
        assert!(!reduced.contains("tel:"), "got {reduced}");
    }

    #[test]
    fn selectors_without_matchable_part_are_kept() {
        let reduced = reduce_unused(PAGE, "::selection{color:red}:root{--x:1}").unwrap();
        assert!(reduced.contains("::selection"));
        assert!(reduced.contains(":root"));
    }

    #[test]
    fn at_rules_are_kept() {
        let css = "@font-face{font-family:x;src:url(x.woff)}.c{font-family:x}";
        let reduced = reduce_unused(PAGE, css).unwrap();
        assert!(reduced.contains("@font-face"));
        assert!(!reduced.contains(".c"));
    }

    #[test]
    fn malformed_css_is_error() {
        let result = reduce_unused(PAGE, ".a..b { color: red; }");
        assert!(matches!(result, Err(CssError::Parse(_))));
    }

    #[test]
    fn strip_dynamic_pseudo_keeps_structural() {
        assert_eq!(strip_dynamic_pseudo("a:hover"), "a");
        assert_eq!(strip_dynamic_pseudo(".x::after"), ".x");
        assert_eq!(strip_dynamic_pseudo("li:first-child"), "li:first-child");
        assert_eq!(strip_dynamic_pseudo("li:nth-child(2n+1)"), "li:nth-child(2n+1)");
        assert_eq!(strip_dynamic_pseudo("::selection"), "");
        assert_eq!(strip_dynamic_pseudo(r#"a[href$="x:y"]:hover"#), r#"a[href$="x:y"]"#);
        assert_eq!(strip_dynamic_pseudo("a[title='a]b:c']"), "a[title='a]b:c']");
    }

    #[test]
    fn post_process_prefixes_and_minifies() {
        let targets = browser_targets(&["safari 9".to_string()]).unwrap();
        let css = post_process(".a {\n  user-select: none;\n}\n", &targets).unwrap();
        assert!(css.contains("-webkit-user-select:none"), "got {css}");
        assert!(!css.contains('\n'));
    }

    #[test]
    fn no_targets_means_no_prefixes() {
        let targets = browser_targets(&[]).unwrap();
        let css = post_process(".a { user-select: none }", &targets).unwrap();
        assert_eq!(css, ".a{user-select:none}");
    }

    #[test]
    fn invalid_browserslist_is_error() {
        assert!(matches!(
            browser_targets(&["definitely not a query".to_string()]),
            Err(CssError::Targets(_))
        ));
    }
}
