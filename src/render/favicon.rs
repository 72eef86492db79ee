//! The `favicon` builtin.
//!
//! `{{favicon https://example.com}}` renders an `<img>` tag pointing at a
//! local copy of that site's icon. Icons are cached in the favicon directory
//! of the publish tree under `<host-slug>+<variant>+.<ext>`; any cached file
//! for the host is reused before anything is downloaded.

use crate::{
    config::SiteConfig,
    error::{BuildError, Result},
    log,
    utils::slug::slugify,
    vars::Vars,
};
use regex::Regex;
use reqwest::{Url, blocking::Client};
use std::{
    fs,
    path::Path,
    sync::LazyLock,
    time::Duration,
};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const FALLBACK_ICON: &str = "/favicon.ico";
const ICON_EXTENSIONS: &[&str] = &["ico", "png", "svg", "gif", "jpg", "jpeg", "webp"];

static RE_LINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").unwrap());
static RE_ICON_REL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\brel\s*=\s*["']?[^"'>]*\bicon\b"#).unwrap()
});
static RE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
});

/// Render the icon of the single website argument.
pub fn render_favicon(args: &[&str], vars: &Vars, config: &SiteConfig) -> Result<String> {
    let [website] = args else {
        return Err(BuildError::Argument(format!(
            "favicon expects one website, got {}",
            args.len()
        )));
    };

    let src = favicon_url(website, vars, config)?;
    Ok(format!(
        r#"<img src="{src}" alt="icon" class="favicon" role="img">"#
    ))
}

/// Site-absolute URL of the cached icon of `website`, downloading it first
/// if no cached copy exists.
pub fn favicon_url(website: &str, vars: &Vars, config: &SiteConfig) -> Result<String> {
    let dir = match vars.get("favicondir") {
        Some(dir) if !dir.is_empty() => dir,
        _ => config.favicondir.as_str(),
    }
    .trim_matches('/');

    let site = parse_site(website)?;
    let slug = slugify(site.host_str().unwrap_or_default());
    let cache = config.publish_dir().join(dir);

    let name = match cached(&cache, &slug) {
        Some(name) => name,
        None => download(&site, &cache, &slug)?,
    };

    Ok(if dir.is_empty() {
        format!("/{name}")
    } else {
        format!("/{dir}/{name}")
    })
}

fn parse_site(website: &str) -> Result<Url> {
    let with_scheme = if website.contains("://") {
        website.to_owned()
    } else {
        format!("https://{website}")
    };
    let url = Url::parse(&with_scheme).map_err(|e| BuildError::Favicon(format!("{website}: {e}")))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(BuildError::Favicon(format!("{website}: no host")));
    }
    Ok(url)
}

/// First cached file for `slug`, by name.
fn cached(cache: &Path, slug: &str) -> Option<String> {
    let prefix = format!("{slug}+");
    let mut names: Vec<String> = fs::read_dir(cache)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(&prefix))
        .collect();
    names.sort_unstable();
    names.into_iter().next()
}

fn download(site: &Url, cache: &Path, slug: &str) -> Result<String> {
    let fetch_err = |e: reqwest::Error| BuildError::Favicon(format!("{site}: {e}"));

    let client = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("zazzy/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(fetch_err)?;

    // a page we cannot read still has a conventional icon location
    let href = client
        .get(site.clone())
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.text())
        .ok()
        .and_then(|html| find_icon_href(&html));

    let icon = href
        .and_then(|href| site.join(&href).ok())
        .map_or_else(|| site.join(FALLBACK_ICON), Ok)
        .map_err(|e| BuildError::Favicon(format!("{site}: {e}")))?;

    let bytes = client
        .get(icon.clone())
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(fetch_err)?;

    let name = format!("{slug}+favicon+.{}", icon_extension(&icon));
    fs::create_dir_all(cache).map_err(|e| BuildError::Write(cache.to_path_buf(), e))?;
    let target = cache.join(&name);
    fs::write(&target, &bytes).map_err(|e| BuildError::Write(target, e))?;

    log!("favicon"; "{} -> {name}", icon);
    Ok(name)
}

/// `href` of the first `<link rel="... icon ...">` tag of a page.
fn find_icon_href(html: &str) -> Option<String> {
    RE_LINK_TAG
        .find_iter(html)
        .map(|tag| tag.as_str())
        .filter(|tag| RE_ICON_REL.is_match(tag))
        .find_map(|tag| {
            let caps = RE_HREF.captures(tag)?;
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_owned())
        })
        .filter(|href| !href.is_empty())
}

/// Extension for a downloaded icon, `ico` when the URL does not tell.
fn icon_extension(icon: &Url) -> String {
    Path::new(icon.path())
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .filter(|ext| ICON_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "ico".to_owned())
}
