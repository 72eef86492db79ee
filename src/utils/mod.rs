//! Utility modules for the static site generator.

pub mod command;
pub mod glob;
pub mod log;
pub mod path;
pub mod slug;
