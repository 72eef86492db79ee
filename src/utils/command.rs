//! External plugin execution.
//!
//! Any executable can act as a macro handler. Plugins are looked up in the
//! site's `.zazzy` directory first and then on `$PATH`, so a local script
//! shadows a system command of the same name. Document variables reach the
//! plugin as `ZS_<KEY>` environment entries.

use crate::{
    config::{ENV_PREFIX, SiteConfig},
    error::{BuildError, Result},
    log,
    vars::Vars,
};
use std::{
    env,
    ffi::OsString,
    path::{MAIN_SEPARATOR, PathBuf},
    process::{Command, Output},
};

// ============================================================================
// Lookup
// ============================================================================

/// Search path seen by plugins: the configuration directory, then `$PATH`.
fn search_path(config: &SiteConfig) -> OsString {
    let inherited = env::var_os("PATH").unwrap_or_default();
    let mut dirs = vec![config.config_dir()];
    dirs.extend(env::split_paths(&inherited));
    env::join_paths(dirs).unwrap_or(inherited)
}

/// Locate the executable for `name`.
///
/// Names containing a path separator are taken relative to the site root.
pub fn resolve_program(config: &SiteConfig, name: &str) -> Option<PathBuf> {
    if name.contains('/') || name.contains(MAIN_SEPARATOR) {
        let path = config.path(name);
        return path.is_file().then_some(path);
    }
    which::which_in(name, Some(search_path(config)), &config.root).ok()
}

// ============================================================================
// Execution
// ============================================================================

/// Prepare a Command with the plugin environment.
fn prepare(config: &SiteConfig, vars: &Vars, name: &str, args: &[&str]) -> Result<Command> {
    let program = resolve_program(config, name).ok_or_else(|| BuildError::Plugin {
        name: name.to_owned(),
        reason: "not found in plugin search path".into(),
    })?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&config.root)
        .env("PATH", search_path(config))
        .env("ZS", &config.executable)
        .env(format!("{ENV_PREFIX}OUTDIR"), config.pubdir_str());

    for (key, value) in vars.iter().filter(|(key, _)| !key.contains(['=', '\0'])) {
        command.env(format!("{ENV_PREFIX}{}", key.to_uppercase()), value);
    }

    Ok(command)
}

/// Run plugin `name` and return its standard output verbatim.
///
/// Standard error is surfaced line by line whatever the exit status. A spawn
/// failure or a non-zero exit is a [`BuildError::Plugin`].
pub fn run_plugin(config: &SiteConfig, vars: &Vars, name: &str, args: &[&str]) -> Result<String> {
    let output = prepare(config, vars, name, args)?
        .output()
        .map_err(|e| BuildError::Plugin {
            name: name.to_owned(),
            reason: e.to_string(),
        })?;

    log_stderr(name, &output);

    if !output.status.success() {
        return Err(BuildError::Plugin {
            name: name.to_owned(),
            reason: output.status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Fire a build hook (`prehook`, `posthook`).
///
/// A hook that does not exist is skipped; a failing one is logged.
pub fn run_hook(config: &SiteConfig, vars: &Vars, hook: &str) {
    if resolve_program(config, hook).is_none() {
        return;
    }
    match run_plugin(config, vars, hook, &[]) {
        Ok(stdout) => {
            for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
                log!(hook; "{line}");
            }
        }
        Err(e) => log!("error"; "{e}"),
    }
}

fn log_stderr(name: &str, output: &Output) {
    for line in stderr_lines(output) {
        log!("warn"; "{name}: {line}");
    }
}

/// Non-blank lines a plugin wrote to standard error.
fn stderr_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_owned)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::CONFIG_DIR;
    use std::{fs, os::unix::fs::PermissionsExt, path::Path};
    use tempfile::TempDir;

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::load(dir.path(), Vec::<(String, String)>::new()).unwrap();
        (dir, config)
    }

    fn install_plugin(dir: &TempDir, name: &str, script: &str) {
        let conf = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&conf).unwrap();
        let path = conf.join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_run_system_command() {
        let (_dir, config) = site();
        let out = run_plugin(&config, &Vars::default(), "echo", &["hello"]).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_vars_exported_with_prefix() {
        let (_dir, config) = site();
        let vars: Vars = [("foo", "bar")].into_iter().collect();
        let out = run_plugin(&config, &vars, "sh", &["-c", "echo $ZS_FOO"]).unwrap();
        assert_eq!(out, "bar\n");
    }

    #[test]
    fn test_outdir_exported() {
        let (_dir, config) = site();
        let out = run_plugin(&config, &Vars::default(), "sh", &["-c", "echo $ZS_OUTDIR"]).unwrap();
        assert_eq!(out, ".pub\n");
    }

    #[test]
    fn test_executable_exported() {
        let (_dir, config) = site();
        let out = run_plugin(&config, &Vars::default(), "sh", &["-c", "printf %s \"$ZS\""]).unwrap();
        assert_eq!(out, config.executable.to_string_lossy());
    }

    #[test]
    fn test_stderr_surfaced_on_success() {
        let (_dir, config) = site();
        let script = "echo careful >&2; echo ok";

        let output = prepare(&config, &Vars::default(), "sh", &["-c", script])
            .unwrap()
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(stderr_lines(&output), vec!["careful".to_string()]);

        // stderr never leaks into the rendered output
        let out = run_plugin(&config, &Vars::default(), "sh", &["-c", script]).unwrap();
        assert_eq!(out, "ok\n");
    }

    #[test]
    fn test_relative_root_finds_local_plugins() {
        let dir = TempDir::new_in(".").unwrap();
        install_plugin(&dir, "greet", "#!/bin/sh\necho hi\n");
        install_plugin(&dir, "prehook", "#!/bin/sh\necho fired > hook.log\n");

        let relative = Path::new(dir.path().file_name().unwrap());
        let config = SiteConfig::load(relative, Vec::<(String, String)>::new()).unwrap();

        assert!(resolve_program(&config, "greet").is_some());
        assert_eq!(run_plugin(&config, &Vars::default(), "greet", &[]).unwrap(), "hi\n");
        assert_eq!(
            run_plugin(&config, &Vars::default(), "./.zazzy/greet", &[]).unwrap(),
            "hi\n"
        );

        run_hook(&config, &Vars::default(), "prehook");
        assert_eq!(fs::read_to_string(dir.path().join("hook.log")).unwrap(), "fired\n");
    }

    #[test]
    fn test_local_plugin_shadows_system_command() {
        let (dir, config) = site();
        install_plugin(&dir, "echo", "#!/bin/sh\necho foo\n");

        let out = run_plugin(&config, &Vars::default(), "echo", &["hello"]).unwrap();
        assert_eq!(out, "foo\n");
    }

    #[test]
    fn test_relative_program_path() {
        let (dir, config) = site();
        install_plugin(&dir, "greet", "#!/bin/sh\necho \"hi $1\"\n");

        let out = run_plugin(&config, &Vars::default(), "./.zazzy/greet", &["you"]).unwrap();
        assert_eq!(out, "hi you\n");
    }

    #[test]
    fn test_nonzero_exit_is_error() {
        let (_dir, config) = site();
        let err = run_plugin(&config, &Vars::default(), "sh", &["-c", "echo out; exit 3"]).unwrap_err();
        assert!(matches!(err, BuildError::Plugin { .. }));
    }

    #[test]
    fn test_missing_plugin_is_error() {
        let (_dir, config) = site();
        let err = run_plugin(&config, &Vars::default(), "no-such-plugin-zz", &[]).unwrap_err();
        assert!(matches!(err, BuildError::Plugin { .. }));
    }

    #[test]
    fn test_hook_runs_in_site_root() {
        let (dir, config) = site();
        install_plugin(&dir, "prehook", "#!/bin/sh\necho fired > hook.log\n");

        run_hook(&config, &Vars::default(), "prehook");
        assert_eq!(fs::read_to_string(dir.path().join("hook.log")).unwrap(), "fired\n");

        // absent hooks are silently skipped
        run_hook(&config, &Vars::default(), "posthook");
    }
}
