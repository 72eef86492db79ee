//! Polling watch mode.
//!
//! Runs a build cycle every second. Each cycle only rebuilds files modified
//! since the previous one started, so an idle site costs one directory walk
//! per second.
//!
//! ```text
//! reset sitemap
//!     │
//!     ▼
//! ┌─► cycle() ──► report ──► advance watermark ──► sleep 1s ─┐
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Layouts and partials live in the hidden configuration directory and are
//! not watched; touch a page to pick up a layout change.

use crate::{
    build::{CycleReport, Orchestrator},
    config::SiteConfig,
    generator::sitemap,
    log,
};
use std::{thread, time::Duration};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Rebuild the site whenever files change. Never returns; the process ends
/// on interrupt.
pub fn watch_site(config: &SiteConfig) -> ! {
    sitemap::reset(config);
    log!(
        "watch";
        "watching {} (publishing to {})",
        config.root.display(),
        config.pubdir.display()
    );

    let mut orchestrator = Orchestrator::new(config);
    loop {
        report(orchestrator.cycle());
        orchestrator.advance();
        thread::sleep(POLL_INTERVAL);
    }
}

fn report(report: CycleReport) {
    if report.dirty() > 0 {
        log!("watch"; "rebuilt {} files ({} failed)", report.dirty(), report.failed);
    }
}
