//! Glob matching for the ignore list and for file list expansion.
//!
//! Both rely on `gix`'s wildmatch. Ignore patterns are matched against the
//! full root-relative path and `*` may cross `/`, so `drafts/*` also hides
//! `drafts/2024/a.md`. List patterns are matched the way a shell expands
//! them: `*` stays within one path component.

use crate::{
    config::{CONFIG_DIR, IGNORE_FILE, SiteConfig},
    error::{BuildError, Result},
    log,
    utils::path::to_rel_string,
};
use gix::glob::wildmatch;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Check a pattern for malformed syntax.
///
/// Rejects an unclosed character class and a trailing escape. Braces carry
/// no meaning and are never an error.
pub fn validate_pattern(pattern: &str) -> std::result::Result<(), String> {
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return Err(format!("`{pattern}`: trailing escape"));
                }
            }
            '[' => {
                // `[]` and `[!]` open a class whose first member is `]`
                if chars.peek() == Some(&'!') || chars.peek() == Some(&'^') {
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                }
                if !chars.by_ref().any(|c| c == ']') {
                    return Err(format!("`{pattern}`: unclosed character class"));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn has_magic(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

// ============================================================================
// Ignore List
// ============================================================================

/// Ordered ignore patterns loaded from `.zazzy/.ignore`.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<String>,
}

impl IgnoreList {
    /// Load the ignore file of the site. A missing file yields only the
    /// publish directory pattern.
    pub fn load(config: &SiteConfig) -> Self {
        let path = config.config_dir().join(IGNORE_FILE);
        let content = fs::read_to_string(&path).unwrap_or_default();
        Self::parse(&content, &config.pubdir_str())
    }

    /// Parse ignore file content: one glob per line, `#` comments and blank
    /// lines skipped, invalid patterns logged and dropped.
    pub fn parse(content: &str, pubdir: &str) -> Self {
        let mut patterns: Vec<String> = content
            .lines()
            .map(|line| line.trim_matches(' '))
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| match validate_pattern(line) {
                Ok(()) => true,
                Err(e) => {
                    log!("error"; "{CONFIG_DIR}/{IGNORE_FILE}: {e}");
                    false
                }
            })
            .map(str::to_owned)
            .collect();

        if let Some(pattern) = pubdir_pattern(pubdir) {
            patterns.push(pattern);
        }
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether the root-relative `path` matches any pattern.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            wildmatch(
                pattern.as_str().into(),
                path.into(),
                wildmatch::Mode::empty(),
            )
        })
    }
}

/// Pattern excluding the publish directory from traversal.
///
/// Dot-directories are already skipped as hidden entries and need none.
fn pubdir_pattern(pubdir: &str) -> Option<String> {
    let name = Path::new(pubdir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.starts_with('.') || pubdir.starts_with('.') {
        return None;
    }
    Some(format!("{}**", pubdir.trim_end_matches('/')))
}

// ============================================================================
// Expansion
// ============================================================================

/// Expand `pattern` against the filesystem below `root`.
///
/// Returned paths are root-relative (absolute when the pattern is), use `/`
/// separators and are sorted by name. An invalid pattern is
/// [`BuildError::NoMatch`]; no match at all is an empty list.
pub fn expand(root: &Path, pattern: &str) -> Result<Vec<String>> {
    validate_pattern(pattern).map_err(|_| BuildError::NoMatch(pattern.to_owned()))?;

    let absolute = pattern.starts_with('/');
    let components: Vec<&str> = pattern
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();
    let literal = components.iter().take_while(|c| !has_magic(c)).count();
    let depth = components.len() - literal;

    let mut base = if absolute {
        PathBuf::from("/")
    } else {
        root.to_path_buf()
    };
    base.extend(&components[..literal]);

    let normalized = format!(
        "{}{}",
        if absolute { "/" } else { "" },
        components.join("/")
    );

    if depth == 0 {
        return Ok(if base.exists() { vec![normalized] } else { Vec::new() });
    }

    let display = |path: &Path| -> String {
        if absolute {
            path.to_string_lossy().into_owned()
        } else {
            to_rel_string(path.strip_prefix(root).unwrap_or(path))
        }
    };

    Ok(WalkDir::new(&base)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| display(entry.path()))
        .filter(|path| {
            wildmatch(
                normalized.as_str().into(),
                path.as_str().into(),
                wildmatch::Mode::NO_MATCH_SLASH_LITERAL,
            )
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
