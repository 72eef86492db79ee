//! Markdown to HTML conversion.

use pulldown_cmark::{Options, Parser, html};

/// Convert a Markdown body to an HTML fragment.
///
/// Raw HTML in the source passes through untouched, which keeps the output
/// of macros like `renderlist` intact.
pub fn to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
