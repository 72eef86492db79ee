//! Plain-text sitemap accumulation.
//!
//! Documents opt in with `sitemap: true` while the site selects the format
//! with `sitemaptype: txt`. Each opted-in document appends
//! `<hosturl>/<url>` to `sitemap.txt` at the publish directory root, at most
//! once (compared case-insensitively, ignoring surrounding whitespace).
//!
//! ```text
//! https://example.com/index.html
//! https://example.com/posts/2024-01-01-hello.html
//! ```
//!
//! The file is deleted at the start of every full build, so each run starts
//! from an empty list.

use crate::{config::SiteConfig, log, vars::Vars};
use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

/// Set once the missing-`hosturl` warning has been printed.
static HOSTURL_WARNED: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Public API
// ============================================================================

/// Record the document at `path` in the sitemap if it opted in.
///
/// I/O failures are logged and otherwise ignored.
pub fn record(path: &str, vars: &Vars, config: &SiteConfig) {
    if !is_enabled(vars) {
        return;
    }

    let host = vars.get("hosturl").unwrap_or_default();
    if host.is_empty() && !HOSTURL_WARNED.swap(true, Ordering::Relaxed) {
        log!("warn"; "generating sitemap without hosturl");
    }

    let entry = join_url(host, vars.url());
    if let Err(e) = append_entry(&config.sitemap_path(), &entry) {
        log!("error"; "sitemap entry for {path}: {e:#}");
    }
}

/// Delete the sitemap left over by a previous run.
pub fn reset(config: &SiteConfig) {
    let path = config.sitemap_path();
    match fs::remove_file(&path) {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            log!("error"; "cannot remove {}: {e}", path.display());
        }
        _ => {}
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn is_enabled(vars: &Vars) -> bool {
    let flag = |key: &str, expected: &str| {
        vars.get(key)
            .is_some_and(|value| value.eq_ignore_ascii_case(expected))
    };
    flag("sitemaptype", "txt") && flag("sitemap", "true")
}

/// Join a host URL and a site-relative URL with exactly one slash.
fn join_url(host: &str, url: &str) -> String {
    if host.is_empty() {
        return url.to_owned();
    }
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// Append `entry` unless an equal line exists. Returns whether it was added.
fn append_entry(path: &Path, entry: &str) -> Result<bool> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut existing = String::new();
    file.read_to_string(&mut existing)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if existing
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case(entry))
    {
        return Ok(false);
    }

    writeln!(file, "{entry}").with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

// ============================================================================
// Tests
// ============================================================================
