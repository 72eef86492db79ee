//! Default values for configuration fields.
//!
//! These functions are used by serde and educe for default construction.

use std::{env, path::PathBuf};

pub fn root() -> PathBuf {
    "./".into()
}

pub fn pubdir() -> PathBuf {
    ".pub".into()
}

pub fn favicondir() -> String {
    "/img/favicons".into()
}

/// Path of the running binary, exported to plugins as `$ZS`.
pub fn executable() -> PathBuf {
    env::current_exe()
        .ok()
        .or_else(|| env::args_os().next().map(PathBuf::from))
        .unwrap_or_else(|| "zazzy".into())
}
