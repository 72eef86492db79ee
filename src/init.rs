//! Site initialization module.
//!
//! Creates a new site with a layout, an item layout, an ignore file, a
//! configuration file and a first page.

use crate::config::{CONFIG_DIR, CONFIG_FILE, IGNORE_FILE, SiteConfig};
use anyhow::{Context, Result, bail};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{{title}}</title>
  <meta name="description" content="{{description}}">
</head>
<body>
{{content}}
</body>
</html>
"#;

const ITEM_LAYOUT: &str = r#"<li><a href="/{{url}}">{{title}}</a></li>
"#;

const IGNORE: &str = "# One glob per line, matched against root-relative paths.
# drafts/*
# *.tmp
";

/// Options of `zazzy init`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub host_url: Option<String>,
    pub sitemap: bool,
}

/// Create a new site in `root/name`. Returns the site directory.
pub fn new_site(root: &Path, name: &Path, options: &InitOptions) -> Result<PathBuf> {
    let site = root.join(name);
    if !is_dir_empty(&site)? {
        bail!(
            "Path `{}` is not empty. Choose another site name.",
            site.display()
        );
    }

    let conf = site.join(CONFIG_DIR);
    fs::create_dir_all(&conf).with_context(|| format!("Failed to create {}", conf.display()))?;

    create_file(&conf.join("layout.html"), LAYOUT)?;
    create_file(&conf.join("itemlayout.html"), ITEM_LAYOUT)?;
    create_file(&conf.join(IGNORE_FILE), IGNORE)?;
    create_file(&conf.join(CONFIG_FILE), &default_config(options)?)?;
    create_file(&site.join("index.md"), &index_page(name, options))?;

    Ok(site)
}

/// Check if a directory is missing or completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let mut entries =
        fs::read_dir(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(entries.next().is_none())
}

fn create_file(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        bail!("Path `{}` already exists.", path.display());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Default configuration file content
fn default_config(options: &InitOptions) -> Result<String> {
    let mut vars = BTreeMap::new();
    if let Some(host_url) = &options.host_url {
        vars.insert("hosturl".to_owned(), host_url.clone());
    }
    if options.sitemap {
        vars.insert("sitemap".to_owned(), "true".to_owned());
        vars.insert("sitemaptype".to_owned(), "txt".to_owned());
    }

    let config = SiteConfig {
        vars,
        ..SiteConfig::default()
    };
    Ok(toml::to_string_pretty(&config)?)
}

fn index_page(name: &Path, options: &InitOptions) -> String {
    let title = name
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "My site".to_owned());

    let mut page = format!("title: {title}\n");
    if options.sitemap {
        page.push_str("sitemap: true\n");
    }
    page.push_str("---\n# {{title}}\n\nWelcome to your new site.\n");
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_site;
    use tempfile::TempDir;

    #[test]
    fn test_new_site_layout() {
        let dir = TempDir::new().unwrap();
        let site = new_site(dir.path(), Path::new("blog"), &InitOptions::default()).unwrap();

        for file in ["layout.html", "itemlayout.html", IGNORE_FILE, CONFIG_FILE] {
            assert!(site.join(CONFIG_DIR).join(file).is_file(), "{file}");
        }
        let index = fs::read_to_string(site.join("index.md")).unwrap();
        assert!(index.starts_with("title: blog\n---\n"));
    }

    #[test]
    fn test_config_round_trips() {
        let dir = TempDir::new().unwrap();
        let options = InitOptions {
            host_url: Some("https://example.com".into()),
            sitemap: true,
        };
        let site = new_site(dir.path(), Path::new("blog"), &options).unwrap();

        let config = SiteConfig::load(&site, Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.globals.get("hosturl"), Some("https://example.com"));
        assert_eq!(config.globals.get("sitemaptype"), Some("txt"));
        assert_eq!(config.pubdir, PathBuf::from(".pub"));
    }

    #[test]
    fn test_scaffold_builds() {
        let dir = TempDir::new().unwrap();
        let options = InitOptions {
            host_url: Some("https://example.com".into()),
            sitemap: true,
        };
        let site = new_site(dir.path(), Path::new("blog"), &options).unwrap();
        let config = SiteConfig::load(&site, Vec::<(String, String)>::new()).unwrap();

        let report = build_site(&config);
        assert_eq!(report.failed, 0);

        let index = fs::read_to_string(site.join(".pub/index.html")).unwrap();
        assert!(index.contains("<title>blog</title>"));
        assert!(index.contains("<h1>blog</h1>"));
        let sitemap = fs::read_to_string(config.sitemap_path()).unwrap();
        assert_eq!(sitemap, "https://example.com/index.html\n");
    }

    #[test]
    fn test_non_empty_target_rejected() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("blog/keep.txt"), "x").unwrap();

        assert!(new_site(dir.path(), Path::new("blog"), &InitOptions::default()).is_err());
    }
}
