//! Site building orchestration.
//!
//! A build cycle walks the project tree once and rebuilds every file
//! modified after the watermark of the previous cycle:
//!
//! ```text
//! cycle()
//!     │
//!     ├── skip hidden and ignored entries (whole subtrees for directories)
//!     ├── mirror directories into the publish directory
//!     │
//!     ├── first dirty file ──► prehook
//!     ├── each dirty file  ──► compiler::build_file()
//!     │
//!     └── any dirty file   ──► posthook
//! ```
//!
//! The first cycle uses the epoch as watermark, so it builds everything. A
//! failing file is logged and counted; it never stops the cycle.

use crate::{
    compiler::build_file,
    config::SiteConfig,
    generator::sitemap,
    log,
    utils::{
        command::run_hook,
        glob::IgnoreList,
        path::{is_hidden, to_rel_string},
    },
};
use std::{
    fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};
use walkdir::{DirEntry, WalkDir};

const PRE_HOOK: &str = "prehook";
const POST_HOOK: &str = "posthook";

/// Outcome of one build cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub built: usize,
    pub failed: usize,
}

impl CycleReport {
    /// Number of dirty files seen, successful or not.
    pub fn dirty(&self) -> usize {
        self.built + self.failed
    }
}

/// Incremental builder holding the watermark between cycles.
pub struct Orchestrator<'a> {
    config: &'a SiteConfig,
    ignore: IgnoreList,
    watermark: SystemTime,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a SiteConfig) -> Self {
        Self {
            config,
            ignore: IgnoreList::load(config),
            watermark: UNIX_EPOCH,
        }
    }

    /// Move the watermark to now; the next cycle only sees later changes.
    pub fn advance(&mut self) {
        self.watermark = SystemTime::now();
    }

    /// Rebuild every file modified strictly after the watermark.
    pub fn cycle(&self) -> CycleReport {
        let config = self.config;
        let publish_dir = config.publish_dir();
        if let Err(e) = fs::create_dir_all(&publish_dir) {
            log!("error"; "cannot create {}: {e}", publish_dir.display());
        }

        let mut report = CycleReport::default();
        let walker = WalkDir::new(&config.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log!("error"; "{e}");
                    continue;
                }
            };
            let path = self.rel_path(entry.path());

            if entry.file_type().is_dir() {
                let mirror = publish_dir.join(&path);
                if let Err(e) = fs::create_dir_all(&mirror) {
                    log!("error"; "cannot create {}: {e}", mirror.display());
                }
                continue;
            }

            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            if !modified.is_some_and(|time| time > self.watermark) {
                continue;
            }

            if report.dirty() == 0 {
                run_hook(config, &config.globals, PRE_HOOK);
            }

            log!("build"; "{path}");
            match build_file(&path, None, &config.globals, config) {
                Ok(()) => report.built += 1,
                Err(e) => {
                    log!("error"; "{path}: {e}");
                    report.failed += 1;
                }
            }
        }

        if report.dirty() > 0 {
            run_hook(config, &config.globals, POST_HOOK);
        }
        report
    }

    fn rel_path(&self, path: &Path) -> String {
        to_rel_string(path.strip_prefix(&self.config.root).unwrap_or(path))
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let path = self.rel_path(entry.path());
        is_hidden(&path) || self.ignore.is_ignored(&path)
    }
}

/// Build the whole site once, starting from an empty sitemap.
pub fn build_site(config: &SiteConfig) -> CycleReport {
    sitemap::reset(config);
    let report = Orchestrator::new(config).cycle();
    log!("build"; "built {} files ({} failed)", report.built, report.failed);
    report
}

// ============================================================================
// Tests
// ============================================================================
