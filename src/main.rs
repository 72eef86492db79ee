//! zazzy - A static site generator with macros, partials and plugins.

mod build;
mod cli;
mod compiler;
mod config;
mod error;
mod generator;
mod init;
mod render;
mod utils;
mod vars;
mod watch;

use anyhow::{Context, Result};
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use init::{InitOptions, new_site};
use std::{
    io::{self, Write},
    path::Path,
    process,
};
use utils::{command::run_plugin, path::to_rel_string};
use vars::Vars;
use watch::watch_site;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let load_config = || SiteConfig::load(&cli.root, std::env::vars());

    match &cli.command {
        Commands::Init {
            name,
            host_url,
            sitemap,
        } => {
            let options = InitOptions {
                host_url: host_url.clone(),
                sitemap: *sitemap,
            };
            let site = new_site(&cli.root, name, &options)?;
            log!("init"; "created {}", site.display());
            Ok(())
        }
        Commands::Build { file: None } => {
            build_site(&load_config()?);
            Ok(())
        }
        Commands::Build { file: Some(file) } => {
            build_to_stdout(file, &load_config()?);
            Ok(())
        }
        Commands::Watch => {
            let config = load_config()?;
            ctrlc::set_handler(|| {
                log!("watch"; "stopped");
                process::exit(0);
            })
            .context("Failed to install Ctrl-C handler")?;
            watch_site(&config)
        }
        Commands::Var { file, keys } => print_vars(file, keys, &load_config()?),
        Commands::Plugin(args) => {
            let Some((name, args)) = args.split_first() else {
                return Ok(());
            };
            let config = load_config()?;
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let output = run_plugin(&config, &config.globals, name, &args)?;
            print!("{output}");
            Ok(())
        }
    }
}

/// Build a single file to stdout, exiting non-zero on failure.
fn build_to_stdout(file: &Path, config: &SiteConfig) {
    let path = to_rel_string(file);
    let mut stdout = io::stdout().lock();
    let result = compiler::build_file(&path, Some(&mut stdout), &config.globals, config);
    let _ = stdout.flush();

    if let Err(e) = result {
        eprintln!("ERROR: {e}");
        process::exit(1);
    }
}

/// Print the resolved variables of `file`, resolved with empty globals.
fn print_vars(file: &Path, keys: &[String], config: &SiteConfig) -> Result<()> {
    let path = to_rel_string(file);
    let (vars, _) = vars::resolve(&path, &Vars::default(), config)
        .with_context(|| format!("Failed to resolve variables of `{path}`"))?;

    let mut stdout = io::stdout().lock();
    if keys.is_empty() {
        for (key, value) in vars.iter() {
            writeln!(stdout, "{key}:{value}")?;
        }
    } else {
        for key in keys {
            writeln!(stdout, "{}", vars.get(key).unwrap_or_default())?;
        }
    }
    Ok(())
}
