//! Second-stage template evaluation for HTML documents.
//!
//! After macro expansion an HTML document is evaluated once more with
//! `<%` and `%>` as action delimiters. Actions are written with dotted field
//! references and are evaluated by `tera`:
//!
//! ```text
//! <% .title %>                          value of `title` (empty when unset)
//! <%/* comment */%>                     nothing
//! <% if .draft %>…<% else %>…<% end %>  conditional
//! <% with .author %>by <% . %><% end %> body only when `author` is set
//! <% range .tags | split(pat=",") %><% . %><% end %>
//! ```
//!
//! `eq`, `ne`, `lt`, `le`, `gt`, `ge`, `and` and `or` may be written in
//! prefix form (`<% if eq .lang "en" %>`). Any other expression is handed to
//! tera as written, so its filters and operators are available too.
//!
//! A `-` next to a delimiter (`<%- .x -%>`) trims the whitespace on that
//! side.

use crate::{
    error::{BuildError, Result},
    vars::Vars,
};
use regex::Regex;
use std::{error::Error as _, sync::LazyLock};

const LEFT_DELIM: &str = "<%";
const RIGHT_DELIM: &str = "%>";

static RE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Go-style prefix operators and their infix counterparts.
const PREFIX_OPS: &[(&str, &str)] = &[
    ("eq", "=="),
    ("ne", "!="),
    ("lt", "<"),
    ("le", "<="),
    ("gt", ">"),
    ("ge", ">="),
    ("and", "and"),
    ("or", "or"),
];

/// Evaluate the actions of `text` against `vars`. `path` names the document
/// in errors.
pub fn render(path: &str, text: &str, vars: &Vars) -> Result<String> {
    let template_err = |message: String| BuildError::Template {
        path: path.to_owned(),
        message,
    };

    if !text.contains(LEFT_DELIM) {
        return Ok(text.to_owned());
    }

    let source = translate(text).map_err(template_err)?;

    let mut context = tera::Context::new();
    for (key, value) in vars.iter().filter(|(key, _)| RE_IDENT.is_match(key)) {
        context.insert(key, value);
    }

    tera::Tera::one_off(&source, &context, false).map_err(|e| template_err(describe(&e)))
}

/// Tera errors keep the interesting part in their source chain.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ============================================================================
// Translation to tera
// ============================================================================

enum Piece {
    Text(String),
    Tag(String),
}

/// Open block: the tag closing it and the value `.` stands for inside.
struct Block {
    end: &'static str,
    dot: Option<String>,
}

/// Rewrite `<% %>` actions into tera syntax. Literal text is protected from
/// tera's own delimiters.
fn translate(text: &str) -> std::result::Result<String, String> {
    let mut pieces = Vec::new();
    let mut blocks: Vec<Block> = Vec::new();
    let mut rest = text;

    while let Some(from) = rest.find(LEFT_DELIM) {
        pieces.push(Piece::Text(rest[..from].to_owned()));
        let after = &rest[from + LEFT_DELIM.len()..];
        let to = after
            .find(RIGHT_DELIM)
            .ok_or_else(|| "unclosed action".to_owned())?;

        let mut action = &after[..to];
        rest = &after[to + RIGHT_DELIM.len()..];

        if let Some(trimmed) = action.strip_prefix("- ") {
            if let Some(Piece::Text(text)) = pieces.last_mut() {
                text.truncate(text.trim_end().len());
            }
            action = trimmed;
        }
        if let Some(trimmed) = action.strip_suffix(" -") {
            rest = rest.trim_start();
            action = trimmed;
        }

        if action.starts_with("/*") {
            if !action.ends_with("*/") {
                return Err("unclosed comment".into());
            }
            continue;
        }

        pieces.push(Piece::Tag(action_tag(action.trim(), &mut blocks)?));
    }
    pieces.push(Piece::Text(rest.to_owned()));

    if let Some(block) = blocks.last() {
        return Err(format!("missing `end` for `{}`", block.end.trim_start_matches("end")));
    }

    Ok(pieces
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(text) if text.contains("{{") || text.contains("{%") || text.contains("{#") => {
                format!("{{% raw %}}{text}{{% endraw %}}")
            }
            Piece::Text(text) | Piece::Tag(text) => text,
        })
        .collect())
}

fn action_tag(action: &str, blocks: &mut Vec<Block>) -> std::result::Result<String, String> {
    let dot = blocks.iter().rev().find_map(|b| b.dot.clone());
    let (keyword, args) = action
        .split_once(char::is_whitespace)
        .map_or((action, ""), |(k, a)| (k, a.trim()));

    match keyword {
        "if" => {
            let cond = expression(args, dot.as_deref())?;
            blocks.push(Block { end: "endif", dot: None });
            Ok(format!("{{% if {cond} %}}"))
        }
        "with" => {
            let value = expression(args, dot.as_deref())?;
            let tag = format!("{{% if {value} %}}");
            blocks.push(Block { end: "endif", dot: Some(value) });
            Ok(tag)
        }
        "range" => {
            let items = expression(args, dot.as_deref())?;
            let item = format!("_dot{}", blocks.len());
            let tag = format!("{{% for {item} in {items} %}}");
            blocks.push(Block { end: "endfor", dot: Some(item) });
            Ok(tag)
        }
        "else" => {
            let block = blocks
                .last_mut()
                .ok_or_else(|| "`else` outside of a block".to_owned())?;
            if block.end != "endif" {
                return Err("`else` is not supported in `range`".into());
            }
            // the else branch of a `with` sees the outer value again
            block.dot = None;
            match args.strip_prefix("if") {
                Some(cond) if cond.starts_with(char::is_whitespace) => {
                    let outer = blocks.iter().rev().find_map(|b| b.dot.clone());
                    let cond = expression(cond.trim(), outer.as_deref())?;
                    Ok(format!("{{% elif {cond} %}}"))
                }
                _ if args.is_empty() => Ok("{% else %}".to_owned()),
                _ => Err(format!("unsupported action `{action}`")),
            }
        }
        "end" => {
            let block = blocks
                .pop()
                .ok_or_else(|| "`end` without an open block".to_owned())?;
            Ok(format!("{{% {} %}}", block.end))
        }
        "define" | "template" | "block" | "break" | "continue" => {
            Err(format!("unsupported action `{action}`"))
        }
        _ => {
            let value = expression(action, dot.as_deref())?;
            if RE_IDENT.is_match(&value) {
                Ok(format!("{{{{ {value} | default(value=\"\") }}}}"))
            } else {
                Ok(format!("{{{{ {value} }}}}"))
            }
        }
    }
}

/// Translate one pipeline: `.key` becomes `key`, `.` becomes the current
/// value and a prefix operator becomes infix.
fn expression(expr: &str, dot: Option<&str>) -> std::result::Result<String, String> {
    let tokens: Vec<String> = tokenize(expr)
        .into_iter()
        .map(|token| field(&token, dot))
        .collect::<std::result::Result<_, _>>()?;

    if tokens.is_empty() {
        return Err("missing value".into());
    }

    if let [op, left, right] = tokens.as_slice() {
        if let Some((_, infix)) = PREFIX_OPS.iter().find(|(name, _)| name == op) {
            return Ok(format!("{left} {infix} {right}"));
        }
    }
    Ok(tokens.join(" "))
}

fn field(token: &str, dot: Option<&str>) -> std::result::Result<String, String> {
    if token.starts_with(['"', '\'', '`']) {
        return Ok(token.replace('`', "\""));
    }

    let opened = token.len() - token.trim_start_matches('(').len();
    let closed = token.len() - token.trim_end_matches(')').len();
    if opened + closed >= token.len() {
        return Ok(token.to_owned());
    }
    let core = &token[opened..token.len() - closed];

    let mapped = if core == "." {
        dot.ok_or_else(|| "`.` used outside of `with` or `range`".to_owned())?
            .to_owned()
    } else if let Some(name) = core.strip_prefix('.').filter(|n| RE_IDENT.is_match(n)) {
        name.to_owned()
    } else {
        core.to_owned()
    };
    Ok(format!("{}{mapped}{}", &token[..opened], &token[token.len() - closed..]))
}

/// Split on whitespace, keeping quoted strings whole.
fn tokenize(expr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote = None;

    for c in expr.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if matches!(c, '"' | '\'' | '`') {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
