//! Error types for document resolution, macro expansion and output.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a single document.
///
/// Only [`BuildError::UnterminatedMacro`] aborts a render call; the other
/// macro-level failures are logged by the expander and render as nothing.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot read `{}`: {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),

    #[error("cannot write `{}`: {}", .0.display(), .1)]
    Write(PathBuf, #[source] std::io::Error),

    #[error("failed to parse header of `{path}`: {message}")]
    Parse { path: String, message: String },

    #[error("close delimiter `}}}}` not found")]
    UnterminatedMacro,

    #[error("{0}")]
    Argument(String),

    #[error("no file matches pattern `{0}`")]
    NoMatch(String),

    #[error("plugin `{name}` failed: {reason}")]
    Plugin { name: String, reason: String },

    #[error("template error in `{path}`: {message}")]
    Template { path: String, message: String },

    #[error("favicon: {0}")]
    Favicon(String),
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
