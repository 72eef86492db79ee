//! Macro expansion.
//!
//! A document body may contain `{{command arg1 arg2}}` macros. Each macro is
//! split on whitespace and resolved by the first strategy that applies:
//!
//! | Command                   | Result                                     |
//! |---------------------------|--------------------------------------------|
//! | `renderlist PATTERN`      | one rendered item per matching file        |
//! | `favicon URL`             | `<img>` tag for the site's cached favicon  |
//! | `name.html` / `name.md`   | `.zazzy/name.*` partial, expanded in turn  |
//! | `key` (no arguments)      | value of the variable `key`                |
//! | anything else             | stdout of the plugin `command arg1 arg2`   |
//!
//! Arguments are passed through as written. A failing strategy is logged and
//! the macro renders as nothing; only a missing `}}` fails the expansion.

pub mod favicon;
pub mod list;

use crate::{
    config::{CONFIG_DIR, SiteConfig},
    error::{BuildError, Result},
    log,
    utils::{command::run_plugin, path::ext},
    vars::Vars,
};
use std::fs;

const OPEN_DELIM: &str = "{{";
const CLOSE_DELIM: &str = "}}";

/// Partial nesting beyond this depth is included without expansion.
pub const MAX_DEPTH: usize = 10;

const RENDER_LIST: &str = "renderlist";
const FAVICON: &str = "favicon";

/// Expand every macro of `text` with `vars`.
///
/// `depth` starts at 1 for a document body and grows by one per partial.
pub fn expand(text: &str, vars: &Vars, depth: usize, config: &SiteConfig) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(from) = rest.find(OPEN_DELIM) {
        let after = &rest[from + OPEN_DELIM.len()..];
        let to = after.find(CLOSE_DELIM).ok_or(BuildError::UnterminatedMacro)?;

        out.push_str(&rest[..from]);
        let fields: Vec<&str> = after[..to].split_whitespace().collect();
        rest = &after[to + CLOSE_DELIM.len()..];

        out.push_str(&resolve_macro(&fields, vars, depth, config));
    }

    out.push_str(rest);
    Ok(out)
}

/// Resolve one macro, rendering failures as nothing.
fn resolve_macro(fields: &[&str], vars: &Vars, depth: usize, config: &SiteConfig) -> String {
    let Some((&command, args)) = fields.split_first() else {
        log!("error"; "empty macro, nothing rendered");
        return String::new();
    };

    let result = match command {
        RENDER_LIST => list::render_list(args, vars, config),
        FAVICON => favicon::render_favicon(args, vars, config),
        _ => {
            if let Some(partial) = read_partial(command, config) {
                return include_partial(command, &partial, vars, depth, config);
            }
            if let ([], Some(value)) = (args, vars.get(command)) {
                return value.to_owned();
            }
            run_plugin(config, vars, command, args)
        }
    };

    result.unwrap_or_else(|e| {
        log!("error"; "macro `{command}`: {e}");
        String::new()
    })
}

/// Content of the partial named `command`, if it names an existing one.
fn read_partial(command: &str, config: &SiteConfig) -> Option<String> {
    if !matches!(ext(command), ".html" | ".md") {
        return None;
    }
    fs::read_to_string(config.config_dir().join(command)).ok()
}

fn include_partial(
    name: &str,
    content: &str,
    vars: &Vars,
    depth: usize,
    config: &SiteConfig,
) -> String {
    if depth > MAX_DEPTH {
        return content.to_owned();
    }
    expand(content, vars, depth + 1, config).unwrap_or_else(|e| {
        log!("error"; "partial {CONFIG_DIR}/{name}: {e}");
        String::new()
    })
}

// ============================================================================
// Tests
// ============================================================================
