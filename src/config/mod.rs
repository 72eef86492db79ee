//! Site configuration.
//!
//! Configuration is layered, lowest precedence first:
//!
//! | Source                    | Provides                                   |
//! |---------------------------|--------------------------------------------|
//! | built-in defaults         | `pubdir = ".pub"`, `favicondir`            |
//! | `.zazzy/config.toml`      | `pubdir`, `favicondir`, `[vars]`           |
//! | `ZS_*` environment        | global variables, `ZS_PUBDIR` override     |
//!
//! # Example
//!
//! ```toml
//! pubdir = "public"
//!
//! [vars]
//! hosturl = "https://example.com"
//! sitemap = "true"
//! sitemaptype = "txt"
//! ```

pub mod defaults;
mod error;

pub use error::ConfigError;

use crate::vars::Vars;
use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Directory holding layouts, partials, the ignore file and local plugins.
pub const CONFIG_DIR: &str = ".zazzy";

/// Optional configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Ignore-pattern file inside [`CONFIG_DIR`].
pub const IGNORE_FILE: &str = ".ignore";

/// Prefix of environment entries that become global variables.
pub const ENV_PREFIX: &str = "ZS_";

/// Name of the accumulated sitemap at the publish directory root.
pub const SITEMAP_FILE: &str = "sitemap.txt";

/// Root configuration, built once per command invocation.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Project root; every relative path is resolved against it
    #[serde(skip)]
    #[educe(Default = defaults::root())]
    pub root: PathBuf,

    /// Publish directory, relative to the root
    #[serde(default = "defaults::pubdir")]
    #[educe(Default = defaults::pubdir())]
    pub pubdir: PathBuf,

    /// Favicon cache directory, relative to the publish directory
    #[serde(default = "defaults::favicondir")]
    #[educe(Default = defaults::favicondir())]
    pub favicondir: String,

    /// Extra global variables
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// Effective global variables (file vars overlaid with `ZS_*` entries)
    #[serde(skip)]
    pub globals: Vars,

    /// Running binary, exported to plugins as `$ZS`
    #[serde(skip)]
    #[educe(Default = defaults::executable())]
    pub executable: PathBuf,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Build the configuration for `root` from its optional config file and
    /// the given environment entries.
    ///
    /// The root is made absolute against the current directory, so plugins
    /// and hooks resolve the same way whatever directory they run in.
    pub fn load<I, K, V>(root: &Path, env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let root = std::path::absolute(root)
            .map_err(|err| ConfigError::Io(root.to_path_buf(), err))?;
        let path = root.join(CONFIG_DIR).join(CONFIG_FILE);
        let mut config = if path.is_file() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        config.root = root;
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Overlay `ZS_*` environment entries and compute the effective globals.
    fn apply_env<I, K, V>(&mut self, env: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut globals = Vars::default();
        for (key, value) in &self.vars {
            globals.insert(key.to_lowercase(), value.clone());
        }
        for (key, value) in env {
            let key: String = key.into();
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                globals.insert(name.to_lowercase(), value.into());
            }
        }

        if let Some(pubdir) = globals.get("pubdir").filter(|p| !p.is_empty()) {
            self.pubdir = PathBuf::from(pubdir);
        }
        if let Some(favicondir) = globals.get("favicondir").filter(|f| !f.is_empty()) {
            self.favicondir = favicondir.to_owned();
        }
        self.pubdir = PathBuf::from(shellexpand::tilde(&self.pubdir.to_string_lossy()).as_ref());

        globals.insert("pubdir", self.pubdir_str());
        globals.insert("favicondir", self.favicondir.clone());
        self.globals = globals;
    }

    fn validate(&self) -> Result<()> {
        let pubdir = self.pubdir_str();
        let trimmed = pubdir.trim_end_matches('/');
        if trimmed.is_empty() || trimmed == "." {
            return Err(ConfigError::Validation(format!(
                "pubdir `{pubdir}` must name a directory below the project root"
            ))
            .into());
        }
        Ok(())
    }

    /// Publish directory as written in variables (`.pub`, `public`, ...)
    pub fn pubdir_str(&self) -> String {
        self.pubdir.to_string_lossy().into_owned()
    }

    /// Resolve a root-relative path
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Absolute location of the configuration directory
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    /// Absolute location of the publish directory
    pub fn publish_dir(&self) -> PathBuf {
        self.root.join(&self.pubdir)
    }

    /// Absolute location of the sitemap accumulator
    pub fn sitemap_path(&self) -> PathBuf {
        self.publish_dir().join(SITEMAP_FILE)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::load(dir.path(), no_env()).unwrap();
        assert_eq!(config.pubdir, PathBuf::from(".pub"));
        assert_eq!(config.favicondir, "/img/favicons");
        assert_eq!(config.globals.get("favicondir"), Some("/img/favicons"));
        assert_eq!(config.globals.get("pubdir"), Some(".pub"));
    }

    #[test]
    fn test_env_prefix_becomes_lowercase_global() {
        let dir = TempDir::new().unwrap();
        let env = [("ZS_HOSTURL", "https://example.com"), ("HOME", "/root")];
        let config = SiteConfig::load(dir.path(), env).unwrap();
        assert_eq!(config.globals.get("hosturl"), Some("https://example.com"));
        assert_eq!(config.globals.get("home"), None);
    }

    #[test]
    fn test_env_pubdir_override() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::load(dir.path(), [("ZS_PUBDIR", "public")]).unwrap();
        assert_eq!(config.pubdir, PathBuf::from("public"));
        assert_eq!(config.publish_dir(), dir.path().join("public"));
        assert_eq!(config.sitemap_path(), dir.path().join("public/sitemap.txt"));
    }

    #[test]
    fn test_config_file_layer() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(CONFIG_DIR)).unwrap();
        fs::write(
            dir.path().join(CONFIG_DIR).join(CONFIG_FILE),
            "pubdir = \"site\"\n\n[vars]\nHostURL = \"https://a.test\"\nauthor = \"me\"\n",
        )
        .unwrap();

        let config = SiteConfig::load(dir.path(), [("ZS_AUTHOR", "you")]).unwrap();
        assert_eq!(config.pubdir, PathBuf::from("site"));
        assert_eq!(config.globals.get("hosturl"), Some("https://a.test"));
        // environment wins over the file
        assert_eq!(config.globals.get("author"), Some("you"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(SiteConfig::from_str("output = \"x\"").is_err());
    }

    #[test]
    fn test_relative_root_made_absolute() {
        let dir = TempDir::new_in(".").unwrap();
        let name = dir.path().file_name().unwrap();

        let config = SiteConfig::load(Path::new(name), no_env()).unwrap();
        assert!(config.root.is_absolute());
        assert_eq!(config.root, std::env::current_dir().unwrap().join(name));
        assert!(config.config_dir().is_absolute());
    }

    #[test]
    fn test_pubdir_must_not_be_root() {
        let dir = TempDir::new().unwrap();
        assert!(SiteConfig::load(dir.path(), [("ZS_PUBDIR", "./")]).is_err());
    }
}
