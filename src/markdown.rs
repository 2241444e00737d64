//! Markdown rendering and plain-text extraction.
//!
//! Posts are rendered with pulldown-cmark using a GitHub-flavoured option set
//! and three event rewrites:
//!
//! - raw HTML (block and inline) is turned into text, so it is escaped;
//! - soft breaks become hard breaks (`<br />`), so single newlines survive;
//! - fenced code blocks whose tag syntect knows are replaced by class-based
//!   highlighted markup. Unknown tags fall through to the stock renderer.
//!
//! The highlighted markup uses [`CLASS_STYLE`]; the matching theme CSS comes
//! from [`crate::styles::code_theme_css`].

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use std::sync::LazyLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Class naming shared by the highlighter and the generated theme CSS.
pub const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&(#39|quot|lt|gt|amp);").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render markdown to sanitized HTML.
pub fn to_html(markdown: &str) -> String {
    let mut events: Vec<Event> = Vec::new();
    // (language token, buffered code) while inside a highlightable fence
    let mut fence: Option<(String, String)> = None;

    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if fence.is_none() => {
                let token = info.split_whitespace().next().unwrap_or("").to_string();
                if find_syntax(&token).is_some() {
                    fence = Some((token, String::new()));
                } else {
                    events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))));
                }
            }
            Event::Text(text) if fence.is_some() => {
                if let Some((_, code)) = fence.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) if fence.is_some() => {
                if let Some((token, code)) = fence.take() {
                    match highlight(&token, &code) {
                        Some(markup) => events.push(Event::Html(CowStr::from(markup))),
                        None => {
                            events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                                CowStr::from(token),
                            ))));
                            events.push(Event::Text(CowStr::from(code)));
                            events.push(Event::End(TagEnd::CodeBlock));
                        }
                    }
                }
            }
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            Event::SoftBreak => events.push(Event::HardBreak),
            other => events.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn find_syntax(token: &str) -> Option<&'static SyntaxReference> {
    if token.is_empty() {
        return None;
    }
    let lowercase = token.to_ascii_lowercase();
    SYNTAX_SET
        .find_syntax_by_token(&lowercase)
        .or_else(|| SYNTAX_SET.find_syntax_by_extension(&lowercase))
}

fn highlight(token: &str, code: &str) -> Option<String> {
    let syntax = find_syntax(token)?;
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line).ok()?;
    }
    Some(format!(
        "<pre><code class=\"language-{}\">{}</code></pre>\n",
        token.to_ascii_lowercase(),
        generator.finalize()
    ))
}

/// Reduce rendered HTML to plain text.
///
/// Tags are removed, the five entities the renderer emits are decoded, stray
/// `<` are dropped and whitespace is collapsed. The step repeats until the
/// text is stable, so `strip_tags(strip_tags(x)) == strip_tags(x)`.
pub fn strip_tags(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_once(html: &str) -> String {
    let without_tags = TAG.replace_all(html, "");
    let decoded = ENTITY.replace_all(&without_tags, |caps: &regex::Captures| {
        match caps[1].to_ascii_lowercase().as_str() {
            "#39" => "'",
            "quot" => "\"",
            "lt" => "<",
            "gt" => ">",
            _ => "&",
        }
        .to_string()
    });
    let without_brackets = decoded.replace('<', "");
    WHITESPACE
        .replace_all(&without_brackets, " ")
        .trim()
        .to_string()
}
