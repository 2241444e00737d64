//! Whitespace minification for rendered pages.
//!
//! Outside `<pre>` blocks, a newline plus the whitespace following it collapses
//! to a single newline. Inside `<pre>` blocks (any letter case) the content is
//! kept except that indentation made only of groups of four spaces becomes
//! tabs, one tab per group. That includes lines holding nothing but such
//! indentation. Lines indented by other amounts are left alone.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(<pre[^>]*>.*?</pre>)|\n\s+").unwrap());

pub fn minify_html(html: &str) -> String {
    BLOCKS
        .replace_all(html, |caps: &Captures| match caps.get(1) {
            Some(pre) => tabify(pre.as_str()),
            None => "\n".to_string(),
        })
        .into_owned()
}

fn tabify(block: &str) -> String {
    block.split('\n').map(tabify_line).collect::<Vec<_>>().join("\n")
}

fn tabify_line(line: &str) -> Cow<'_, str> {
    let text = line.trim_start_matches(' ');
    let spaces = line.len() - text.len();
    if spaces == 0 || spaces % 4 != 0 {
        return Cow::Borrowed(line);
    }
    Cow::Owned(format!("{}{text}", "\t".repeat(spaces / 4)))
}
