//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// zazzy static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long, default_value = "./")]
    pub root: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the whole site, or a single file to stdout
    Build {
        /// Source file to build, relative to `root`
        file: Option<PathBuf>,
    },

    /// Rebuild changed files every second until interrupted
    Watch,

    /// Print the variables of a document
    Var {
        /// Source file, relative to `root`
        file: PathBuf,

        /// Only print these variables, one value per line
        keys: Vec<String>,
    },

    /// Init a template site
    Init {
        /// the name(path) of site directory, related to `root`
        name: PathBuf,

        /// Public URL of the site, used for sitemap entries
        #[arg(long)]
        host_url: Option<String>,

        /// enable sitemap generation
        #[arg(long)]
        sitemap: bool,
    },

    /// Run a plugin with the global variables and print its output
    #[command(external_subcommand)]
    Plugin(Vec<String>),
}
